// Engine: the GitHub backend and a fixture-serving stub.

pub mod github;
mod interface;
pub mod stub;

pub use github::GitHubEngine;
pub use interface::{Engine, EngineHandle, Event, Request};
pub use stub::{RequestLog, StubEngine};
