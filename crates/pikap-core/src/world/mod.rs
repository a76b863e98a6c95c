//! Static world configuration produced by the generator.
//!
//! The table maps check ids to memory conditions and item ids to memory
//! effects. It is loaded and validated once, before the client starts, and is
//! read-only afterwards.

mod condition;
mod table;

pub use condition::*;
pub use table::*;
