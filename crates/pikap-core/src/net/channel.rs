use crate::error::Result;
use crate::items::PendingDelta;
use crate::net::protocol::NetworkItem;
use crate::world::CheckId;

/// Something the server told us
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    AuthAccepted {
        slot: i64,
        /// Locations the server already has for this slot
        checked: Vec<CheckId>,
    },
    AuthRejected {
        reasons: Vec<String>,
    },
    Deltas {
        start: u64,
        items: Vec<NetworkItem>,
    },
    /// The transport failed; the channel reconnects on its own
    ProtocolError(String),
    /// The server closed the connection
    Disconnected,
}

impl ServerEvent {
    /// Number each item of a `Deltas` batch from its start index.
    pub fn sequence(start: u64, items: &[NetworkItem]) -> Vec<PendingDelta> {
        items
            .iter()
            .zip(start..)
            .map(|(item, index)| PendingDelta {
                index,
                item: item.item,
                location: item.location,
                player: item.player,
                flags: item.flags,
            })
            .collect()
    }
}

/// Session-level link to the multiworld server.
///
/// Sends never block on the network. Failing sends return
/// [`Error::NotConnected`](crate::Error::NotConnected) and are the caller's to retry.
pub trait MessageChannel {
    /// Connected and greeted by the server
    fn is_ready(&self) -> bool;

    fn authenticate(&mut self, slot_name: &str) -> Result<()>;

    fn send_checks(&mut self, checks: &[CheckId]) -> Result<()>;

    fn send_goal(&mut self) -> Result<()>;

    /// Ask for the full item list again
    fn request_resync(&mut self) -> Result<()>;

    fn poll_event(&mut self) -> Option<ServerEvent>;

    /// Flush outstanding sends and disconnect.
    fn close(&mut self);
}
