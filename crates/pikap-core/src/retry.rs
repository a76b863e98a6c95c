//! Retry delays for reconnect loops.

use std::time::Duration;

/// How long to wait before the next attempt after `attempt` consecutive failures
pub trait RetryStrategy: Send {
    fn delay(&self, attempt: u32) -> Duration;
}

/// The same delay every time.
///
/// Emulator boot and server restarts take unpredictable time, so reconnects
/// do not back off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }
}

impl RetryStrategy for FixedDelay {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}
