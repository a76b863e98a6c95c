//! Access to the emulated GameCube memory.
//!
//! - [`MemoryBridge`]: the attach / read / write contract the rest of the crate uses
//! - [`DolphinBridge`]: the implementation backed by a running Dolphin process
//! - [`ProcessHandle`]: OS-level process lookup and raw memory access

mod bridge;
mod dolphin;
pub mod layout;
mod process;

#[cfg(test)]
pub mod mock;

pub use bridge::MemoryBridge;
pub use dolphin::{DolphinBridge, ProcessTarget};
pub use process::*;

#[cfg(test)]
pub use mock::{MockBridge, MockBridgeBuilder};
