pub mod auth;
pub mod client;
pub mod graphql;
pub mod rate_limit;
