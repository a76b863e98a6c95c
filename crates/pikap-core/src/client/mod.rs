//! The bridge client.
//!
//! [`Client`] owns every piece of mutable session state (reported checks,
//! applied item index, outbox, status) and drives it through one state
//! machine on a single thread:
//!
//! ```text
//! DISCONNECTED -> PROBING -> CONNECTED -> AUTHENTICATING -> SYNCED
//!      ^            |  \                                      |
//!      |            |   +-> WRONG_IMAGE                      |
//!      +------------+---------- memory fault ----------------+
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pikap_core::{ArchipelagoChannel, Client, ClientConfig, DolphinBridge, WakeSignal, WorldTable};
//!
//! let wake = Arc::new(WakeSignal::new());
//! let table = WorldTable::builtin();
//! let channel = ArchipelagoChannel::connect(channel_config, Arc::clone(&wake))?;
//! let config = ClientConfig::builder().session_dir("sessions").build();
//! let mut client = Client::new(DolphinBridge::default(), channel, table, config, wake);
//! let status = client.status();
//! client.run();
//! ```

mod game_loop;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::detector::{CheckDetector, ReportedSet};
use crate::items::{ItemApplier, PendingDelta};
use crate::memory::MemoryBridge;
use crate::memory::layout::timing;
use crate::net::MessageChannel;
use crate::probe::IdentityProbe;
use crate::retry::FixedDelay;
use crate::signal::WakeSignal;
use crate::status::{ConnectionStatus, StatusHandle};
use crate::storage::SessionLog;
use crate::world::{CheckId, WorldTable};

/// Configuration for the client loop
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Tick interval while attached
    pub poll_interval: Duration,
    /// Delay between attach, probe and authentication attempts
    pub retry: FixedDelay,
    /// Directory for session logs; no log when unset
    pub session_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(timing::POLL_INTERVAL_MS),
            retry: FixedDelay::from_secs(timing::RETRY_DELAY_SECS),
            session_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for ClientConfig
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    poll_interval: Option<Duration>,
    retry: Option<FixedDelay>,
    session_dir: Option<PathBuf>,
}

impl ClientConfigBuilder {
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry = Some(FixedDelay(delay));
        self
    }

    pub fn session_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.session_dir = Some(path.into());
        self
    }

    pub fn build(self) -> ClientConfig {
        let default = ClientConfig::default();
        ClientConfig {
            poll_interval: self.poll_interval.unwrap_or(default.poll_interval),
            retry: self.retry.unwrap_or(default.retry),
            session_dir: self.session_dir.or(default.session_dir),
        }
    }
}

/// Memory-to-server sync client
pub struct Client<B, C> {
    pub(crate) bridge: B,
    pub(crate) channel: C,
    pub(crate) table: WorldTable,
    pub(crate) config: ClientConfig,
    pub(crate) probe: IdentityProbe,
    pub(crate) detector: CheckDetector,
    pub(crate) applier: ItemApplier,
    /// Checks detected or confirmed by the server this session
    pub(crate) reported: ReportedSet,
    /// Detected checks not yet handed to the channel
    pub(crate) outbox: Vec<CheckId>,
    /// Received items waiting for the applier
    pub(crate) pending: Vec<PendingDelta>,
    pub(crate) state: ConnectionStatus,
    pub(crate) status: StatusHandle,
    pub(crate) wake: Arc<WakeSignal>,
    pub(crate) session: Option<SessionLog>,
    /// The server accepted our `Connect` on the current connection
    pub(crate) authenticated: bool,
    /// Slot name we authenticated (or tried to) with
    pub(crate) slot_name: Option<String>,
    /// A `Sync` was sent and the full resend has not arrived yet
    pub(crate) awaiting_resync: bool,
    pub(crate) goal_sent: bool,
    /// Earliest time for the next attach / authentication attempt
    pub(crate) retry_at: Option<Instant>,
}

impl<B: MemoryBridge, C: MessageChannel> Client<B, C> {
    pub fn new(
        bridge: B,
        channel: C,
        table: WorldTable,
        config: ClientConfig,
        wake: Arc<WakeSignal>,
    ) -> Self {
        let session = config.session_dir.as_ref().and_then(|dir| {
            let mut log = SessionLog::new(dir);
            match log.start_session() {
                Ok(path) => {
                    info!("Session log: {}", path.display());
                    Some(log)
                }
                Err(e) => {
                    warn!("Failed to start session log: {}", e);
                    None
                }
            }
        });

        Self {
            probe: IdentityProbe::new(table.game_id()),
            detector: CheckDetector::new(&table),
            bridge,
            channel,
            table,
            config,
            applier: ItemApplier::new(),
            reported: ReportedSet::new(),
            outbox: Vec::new(),
            pending: Vec::new(),
            state: ConnectionStatus::Disconnected,
            status: StatusHandle::new(),
            wake,
            session,
            authenticated: false,
            slot_name: None,
            awaiting_resync: false,
            goal_sent: false,
            retry_at: None,
        }
    }

    /// Handle for observing the client from other threads
    pub fn status(&self) -> StatusHandle {
        self.status.clone()
    }

    pub fn state(&self) -> ConnectionStatus {
        self.state
    }

    pub fn table(&self) -> &WorldTable {
        &self.table
    }

    pub fn reported(&self) -> &ReportedSet {
        &self.reported
    }

    pub fn last_applied(&self) -> Option<u64> {
        self.applier.last_applied()
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}
