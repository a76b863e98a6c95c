//! Server side of the bridge.

mod archipelago;
mod channel;
#[cfg(test)]
pub mod mock;
pub mod protocol;

pub use archipelago::{ArchipelagoChannel, ChannelConfig};
pub use channel::{MessageChannel, ServerEvent};
#[cfg(test)]
pub use mock::{MockChannel, Sent};
