use std::sync::{Arc, Mutex, MutexGuard};

use strum::{Display, IntoStaticStr};

/// Externally visible connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Probing,
    WrongImage,
    Connected,
    Authenticating,
    Synced,
    ShuttingDown,
}

#[derive(Debug, Default)]
struct Inner {
    status: ConnectionStatus,
    message: String,
    /// Bumped on every change so pollers can skip unchanged snapshots
    generation: u64,
}

/// Shared view of the client status.
///
/// Only the state machine writes; presentation layers poll.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<Mutex<Inner>>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().status
    }

    pub fn message(&self) -> String {
        self.lock().message.clone()
    }

    /// Status, message and generation in one consistent read
    pub fn snapshot(&self) -> (ConnectionStatus, String, u64) {
        let inner = self.lock();
        (inner.status, inner.message.clone(), inner.generation)
    }

    pub(crate) fn set(&self, status: ConnectionStatus, message: impl Into<String>) {
        let message = message.into();
        let mut inner = self.lock();
        if inner.status == status && inner.message == message {
            return;
        }
        inner.status = status;
        inner.message = message;
        inner.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(ConnectionStatus::Disconnected.to_string(), "DISCONNECTED");
        assert_eq!(ConnectionStatus::WrongImage.to_string(), "WRONG_IMAGE");
        assert_eq!(ConnectionStatus::ShuttingDown.to_string(), "SHUTTING_DOWN");
    }

    #[test]
    fn test_handle_is_shared_between_clones() {
        let handle = StatusHandle::new();
        let view = handle.clone();
        handle.set(ConnectionStatus::Probing, "Checking game id");

        assert_eq!(view.status(), ConnectionStatus::Probing);
        assert_eq!(view.message(), "Checking game id");
    }

    #[test]
    fn test_generation_only_changes_on_update() {
        let handle = StatusHandle::new();
        handle.set(ConnectionStatus::Connected, "ok");
        let (_, _, first) = handle.snapshot();
        handle.set(ConnectionStatus::Connected, "ok");
        let (_, _, second) = handle.snapshot();
        handle.set(ConnectionStatus::Synced, "ok");
        let (_, _, third) = handle.snapshot();

        assert_eq!(first, second);
        assert_eq!(third, first + 1);
    }
}
