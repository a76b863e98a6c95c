//! State machine ticks.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::Client;
use crate::error::Error;
use crate::items::PendingDelta;
use crate::memory::MemoryBridge;
use crate::net::{MessageChannel, ServerEvent};
use crate::probe::{ProbeOutcome, decode_slot_name};
use crate::retry::RetryStrategy;
use crate::signal::WaitOutcome;
use crate::status::ConnectionStatus;
use crate::storage::SessionEvent;
use crate::world::CheckId;

impl<B: MemoryBridge, C: MessageChannel> Client<B, C> {
    /// Run until shutdown is triggered on the wake signal.
    ///
    /// Never returns early on errors: memory and network failures become
    /// state transitions and are retried.
    pub fn run(&mut self) {
        info!(
            "Watching {} checks for {} ({})",
            self.table.checks().len(),
            self.table.game(),
            self.table.game_id()
        );

        while !self.wake.is_shutdown() {
            let delay = self.tick();
            if self.wake.wait(delay) == WaitOutcome::Shutdown {
                break;
            }
        }

        self.shutdown();
    }

    /// Advance the state machine by one step; returns how long to wait before
    /// the next tick.
    pub fn tick(&mut self) -> Duration {
        self.drain_events();

        let delay = match self.state {
            ConnectionStatus::Disconnected | ConnectionStatus::WrongImage => self.try_attach(),
            ConnectionStatus::Probing => self.run_probe(),
            ConnectionStatus::Connected => self.try_authenticate(),
            ConnectionStatus::Authenticating => self.config.poll_interval,
            ConnectionStatus::Synced => self.sync(),
            ConnectionStatus::ShuttingDown => return Duration::ZERO,
        };

        self.flush_outbox();
        delay
    }

    /// Leave the loop: flush what can be sent, close the channel, detach.
    pub fn shutdown(&mut self) {
        self.set_state(ConnectionStatus::ShuttingDown, "Shutting down");
        self.flush_outbox();
        if !self.outbox.is_empty() {
            warn!("{} checks were not sent", self.outbox.len());
        }
        self.channel.close();
        self.bridge.detach();
    }

    fn set_state(&mut self, state: ConnectionStatus, message: impl Into<String>) {
        let message = message.into();
        if self.state != state {
            info!("{} -> {}: {}", self.state, state, message);
            self.state = state;
        }
        self.status.set(state, message);
    }

    fn schedule_retry(&mut self) -> Duration {
        let delay = self.config.retry.delay(0);
        self.retry_at = Some(Instant::now() + delay);
        delay
    }

    /// Time left before the next attempt, or `None` if it is due.
    fn retry_pending(&self) -> Option<Duration> {
        let at = self.retry_at?;
        let remaining = at.saturating_duration_since(Instant::now());
        (!remaining.is_zero()).then_some(remaining)
    }

    fn try_attach(&mut self) -> Duration {
        if let Some(remaining) = self.retry_pending() {
            return remaining;
        }

        if self.bridge.attach() {
            self.retry_at = None;
            self.set_state(ConnectionStatus::Probing, "Checking game id");
            return Duration::ZERO;
        }

        // No process to attach to, so any earlier wrong-image verdict is stale
        self.set_state(ConnectionStatus::Disconnected, "Waiting for Dolphin");
        self.schedule_retry()
    }

    fn run_probe(&mut self) -> Duration {
        match self.probe.verify(&self.bridge) {
            ProbeOutcome::Confirmed => {
                self.detector.reset();
                self.set_state(
                    ConnectionStatus::Connected,
                    format!("{} is running", self.probe.expected()),
                );
                Duration::ZERO
            }
            ProbeOutcome::WrongImage { found } => {
                self.bridge.detach();
                let message = if found.is_empty() {
                    "No game is running".to_string()
                } else {
                    Error::WrongImage {
                        expected: self.probe.expected().to_string(),
                        found,
                    }
                    .to_string()
                };
                self.set_state(ConnectionStatus::WrongImage, message);
                self.schedule_retry()
            }
            ProbeOutcome::Unreachable => {
                self.bridge.detach();
                self.set_state(ConnectionStatus::Disconnected, "Game memory is unreachable");
                self.schedule_retry()
            }
        }
    }

    fn try_authenticate(&mut self) -> Duration {
        let slot = match self.read_slot_name() {
            Ok(slot) => slot,
            Err(e) => return self.memory_fault(e),
        };
        let Some(slot) = slot else {
            self.set_state(ConnectionStatus::Connected, "Waiting for a save file to load");
            return self.config.poll_interval;
        };

        if self.authenticated {
            if self.slot_name.as_deref() != Some(slot.as_str()) {
                warn!(
                    "Slot name changed to {:?} while connected as {:?}",
                    slot, self.slot_name
                );
            }
            self.enter_synced();
            return Duration::ZERO;
        }

        if !self.channel.is_ready() {
            self.set_state(ConnectionStatus::Connected, "Waiting for the server");
            return self.config.poll_interval;
        }
        if let Some(remaining) = self.retry_pending() {
            return remaining.min(self.config.poll_interval);
        }

        match self.channel.authenticate(&slot) {
            Ok(()) => {
                self.set_state(
                    ConnectionStatus::Authenticating,
                    format!("Authenticating as {}", slot),
                );
                self.slot_name = Some(slot);
            }
            Err(e) => debug!("Authentication not sent: {}", e),
        }
        self.config.poll_interval
    }

    /// Slot name from the auth region; `None` while the region is blank.
    fn read_slot_name(&self) -> crate::Result<Option<String>> {
        let auth = self.table.auth();
        let raw = self.bridge.read(auth.address, auth.length)?;
        Ok(decode_slot_name(&raw))
    }

    fn enter_synced(&mut self) {
        let slot = self.slot_name.clone().unwrap_or_default();
        self.retry_at = None;
        self.set_state(ConnectionStatus::Synced, format!("Connected as {}", slot));
    }

    fn sync(&mut self) -> Duration {
        let snapshot = match self.detector.plan().read(&self.bridge) {
            Ok(snapshot) => snapshot,
            Err(e) => return self.memory_fault(e),
        };

        let newly = self
            .detector
            .detect(&self.table, &snapshot, &mut self.reported);
        for id in newly {
            if !self.outbox.contains(&id) {
                self.outbox.push(id);
            }
        }

        if let Err(e) = self.apply_pending() {
            return self.memory_fault(e);
        }

        if !self.goal_sent && self.table.goal().is_some_and(|goal| snapshot.holds(goal)) {
            match self.channel.send_goal() {
                Ok(()) => {
                    info!("Goal reached");
                    self.goal_sent = true;
                    self.log_session(SessionEvent::GoalSent, 0, self.table.game(), "");
                }
                Err(e) => debug!("Goal not sent: {}", e),
            }
        }

        self.config.poll_interval
    }

    /// Apply buffered items; only memory errors are returned.
    fn apply_pending(&mut self) -> crate::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut batch = self.applier.unapplied(std::mem::take(&mut self.pending));
        batch.sort_by_key(|d| d.index);
        batch.dedup_by_key(|d| d.index);

        match self.applier.apply(&mut self.bridge, &self.table, &batch) {
            Ok(count) => {
                self.log_items(&batch[..count]);
                Ok(())
            }
            Err(Error::OutOfOrder { expected, actual }) => {
                warn!(
                    "Items out of order (expected {}, got {}), requesting resync",
                    expected, actual
                );
                if !self.awaiting_resync {
                    match self.channel.request_resync() {
                        Ok(()) => self.awaiting_resync = true,
                        Err(e) => debug!("Resync not sent: {}", e),
                    }
                }
                Ok(())
            }
            Err(e) => {
                // Keep what was not written for the next attachment
                let done = self.applier.next_index();
                self.log_items(&batch.iter().copied().filter(|d| d.index < done).collect::<Vec<_>>());
                self.pending = batch.into_iter().filter(|d| d.index >= done).collect();
                Err(e)
            }
        }
    }

    fn log_items(&self, applied: &[PendingDelta]) {
        for delta in applied {
            let name = self
                .table
                .item(delta.item)
                .map_or("unknown item", |item| item.name.as_str());
            self.log_session(
                SessionEvent::ItemReceived,
                delta.item,
                name,
                &format!("from player {}", delta.player),
            );
        }
    }

    fn memory_fault(&mut self, e: Error) -> Duration {
        warn!("Memory access failed: {}", e);
        self.bridge.detach();
        self.detector.reset();
        self.set_state(ConnectionStatus::Disconnected, format!("Lost Dolphin: {}", e));
        self.schedule_retry()
    }

    fn drain_events(&mut self) {
        while let Some(event) = self.channel.poll_event() {
            self.handle_event(event);
        }
    }

    fn handle_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::AuthAccepted { slot, checked } => {
                info!("Server accepted slot {}", slot);
                self.authenticated = true;
                self.merge_checked(&checked);
                if self.state == ConnectionStatus::Authenticating {
                    self.enter_synced();
                }
            }
            ServerEvent::AuthRejected { reasons } => {
                self.authenticated = false;
                let reasons = if reasons.is_empty() {
                    "no reason given".to_string()
                } else {
                    reasons.join(", ")
                };
                warn!("Server refused connection: {}", reasons);
                if self.state == ConnectionStatus::Authenticating {
                    self.set_state(
                        ConnectionStatus::Connected,
                        format!("Refused by server: {}", reasons),
                    );
                    self.schedule_retry();
                }
            }
            ServerEvent::Deltas { start, items } => {
                debug!("Received {} items starting at {}", items.len(), start);
                if start == 0 {
                    self.awaiting_resync = false;
                }
                self.pending.extend(ServerEvent::sequence(start, &items));
            }
            ServerEvent::ProtocolError(message) => self.network_lost(&message),
            ServerEvent::Disconnected => self.network_lost("server closed the connection"),
        }
    }

    /// The server remembers these; never send or detect them again.
    fn merge_checked(&mut self, checked: &[CheckId]) {
        self.outbox.retain(|id| !checked.contains(id));

        let mut unsent: Vec<CheckId> = self
            .reported
            .iter()
            .copied()
            .filter(|id| !checked.contains(id) && !self.outbox.contains(id))
            .collect();
        unsent.sort();
        if !unsent.is_empty() {
            debug!("Resending {} checks the server does not have", unsent.len());
        }
        self.outbox.extend(unsent);

        self.reported.extend(checked.iter().copied());
    }

    fn network_lost(&mut self, reason: &str) {
        self.authenticated = false;
        self.awaiting_resync = false;
        // A queued goal may have been dropped with the link; resend once synced again
        self.goal_sent = false;
        if matches!(
            self.state,
            ConnectionStatus::Authenticating | ConnectionStatus::Synced
        ) {
            self.set_state(
                ConnectionStatus::Connected,
                format!("Server connection lost: {}", reason),
            );
        }
    }

    fn flush_outbox(&mut self) {
        if self.outbox.is_empty() || !self.authenticated || !self.channel.is_ready() {
            return;
        }
        match self.channel.send_checks(&self.outbox) {
            Ok(()) => {
                for id in std::mem::take(&mut self.outbox) {
                    let name = self
                        .table
                        .check(id)
                        .map_or("unknown check", |c| c.name.as_str());
                    info!("Sent check {} ({})", id, name);
                    self.log_session(SessionEvent::CheckSent, id.0, name, "");
                }
            }
            Err(e) => debug!("Checks not sent: {}", e),
        }
    }

    fn log_session(&self, event: SessionEvent, id: i64, name: &str, detail: &str) {
        if let Some(log) = &self.session {
            if let Err(e) = log.record(event, id, name, detail) {
                warn!("Failed to write session log: {}", e);
            }
        }
    }
}
