// Shared domain types, used by both the engine layer and the controller.
// Neither layer depends on the other; both import from this module.

pub mod common;
pub mod issue;
pub mod page;

pub use common::*;
pub use issue::*;
pub use page::*;
