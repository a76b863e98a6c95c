//! Scriptable [`MessageChannel`] for tests.

use std::collections::VecDeque;

use super::{MessageChannel, ServerEvent};
use crate::error::{Error, Result};
use crate::world::CheckId;

/// What the client sent, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Auth(String),
    Checks(Vec<CheckId>),
    Goal,
    Resync,
}

#[derive(Debug, Default)]
pub struct MockChannel {
    pub ready: bool,
    pub events: VecDeque<ServerEvent>,
    pub sent: Vec<Sent>,
    pub closed: bool,
}

impl MockChannel {
    pub fn ready() -> Self {
        Self {
            ready: true,
            ..Self::default()
        }
    }

    pub fn push(&mut self, event: ServerEvent) {
        self.events.push_back(event);
    }

    /// Drop the link; pending sends fail until `ready` is set again.
    pub fn drop_link(&mut self) {
        self.ready = false;
        self.events.push_back(ServerEvent::Disconnected);
    }

    pub fn sent_checks(&self) -> Vec<CheckId> {
        self.sent
            .iter()
            .filter_map(|s| match s {
                Sent::Checks(ids) => Some(ids.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn count(&self, kind: &Sent) -> usize {
        self.sent
            .iter()
            .filter(|s| std::mem::discriminant(*s) == std::mem::discriminant(kind))
            .count()
    }

    fn record(&mut self, sent: Sent) -> Result<()> {
        if !self.ready {
            return Err(Error::NotConnected);
        }
        self.sent.push(sent);
        Ok(())
    }
}

impl MessageChannel for MockChannel {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn authenticate(&mut self, slot_name: &str) -> Result<()> {
        self.record(Sent::Auth(slot_name.to_string()))
    }

    fn send_checks(&mut self, checks: &[CheckId]) -> Result<()> {
        self.record(Sent::Checks(checks.to_vec()))
    }

    fn send_goal(&mut self) -> Result<()> {
        self.record(Sent::Goal)
    }

    fn request_resync(&mut self) -> Result<()> {
        self.record(Sent::Resync)
    }

    fn poll_event(&mut self) -> Option<ServerEvent> {
        self.events.pop_front()
    }

    fn close(&mut self) {
        self.closed = true;
        self.ready = false;
    }
}
