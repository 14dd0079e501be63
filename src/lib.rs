// Pedantic: suppress noise for internal crate code.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

pub mod app;
pub mod config;
pub mod context;
pub mod engine;
pub mod filter;
pub(crate) mod github;
pub mod local;
pub mod pagination;
pub mod query;
pub mod types;
pub mod url;
pub(crate) mod util;
pub mod views;
