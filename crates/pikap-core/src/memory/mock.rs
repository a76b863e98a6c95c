//! In-memory [`MemoryBridge`] for tests.

use std::cell::Cell;
use std::collections::BTreeMap;

use super::MemoryBridge;
use crate::error::{Error, Result};

/// Sparse fake of the emulated memory with failure injection.
///
/// Unset bytes read as zero.
#[derive(Debug, Default)]
pub struct MockBridge {
    memory: BTreeMap<u32, u8>,
    attached: bool,
    attach_succeeds: bool,
    /// Fail every read after this many more successful ones
    reads_before_failure: Cell<Option<usize>>,
    /// Fail every write after this many more successful ones
    writes_before_failure: Option<usize>,
    pub attach_calls: usize,
    pub detach_calls: usize,
    pub writes: Vec<(u32, Vec<u8>)>,
}

impl MockBridge {
    pub fn byte(&self, address: u32) -> u8 {
        self.memory.get(&address).copied().unwrap_or(0)
    }

    pub fn set_byte(&mut self, address: u32, value: u8) {
        self.memory.insert(address, value);
    }

    pub fn set_bytes(&mut self, address: u32, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.memory.insert(address + i as u32, *b);
        }
    }

    pub fn set_attach_succeeds(&mut self, succeeds: bool) {
        self.attach_succeeds = succeeds;
    }

    /// Simulate the process disappearing: the handle stays "attached" but
    /// every access now fails.
    pub fn lose_process(&mut self) {
        self.reads_before_failure.set(Some(0));
        self.writes_before_failure = Some(0);
    }

    pub fn restore_process(&mut self) {
        self.reads_before_failure.set(None);
        self.writes_before_failure = None;
    }

    pub fn fail_writes_after(&mut self, count: usize) {
        self.writes_before_failure = Some(count);
    }
}

impl MemoryBridge for MockBridge {
    fn attach(&mut self) -> bool {
        self.attach_calls += 1;
        if self.attached {
            return true;
        }
        self.attached = self.attach_succeeds;
        self.attached
    }

    fn detach(&mut self) {
        self.detach_calls += 1;
        self.attached = false;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn read(&self, address: u32, length: usize) -> Result<Vec<u8>> {
        if !self.attached {
            return Err(Error::AttachLost);
        }
        if let Some(remaining) = self.reads_before_failure.get() {
            if remaining == 0 {
                return Err(Error::AttachLost);
            }
            self.reads_before_failure.set(Some(remaining - 1));
        }
        Ok((0..length as u32).map(|i| self.byte(address + i)).collect())
    }

    fn write(&mut self, address: u32, bytes: &[u8]) -> Result<()> {
        if !self.attached {
            return Err(Error::AttachLost);
        }
        if let Some(remaining) = self.writes_before_failure {
            if remaining == 0 {
                return Err(Error::AttachLost);
            }
            self.writes_before_failure = Some(remaining - 1);
        }
        self.set_bytes(address, bytes);
        self.writes.push((address, bytes.to_vec()));
        Ok(())
    }
}

/// Builder for [`MockBridge`]
#[derive(Debug)]
pub struct MockBridgeBuilder {
    bridge: MockBridge,
}

impl MockBridgeBuilder {
    pub fn new() -> Self {
        Self {
            bridge: MockBridge {
                attach_succeeds: true,
                ..MockBridge::default()
            },
        }
    }

    pub fn bytes(mut self, address: u32, bytes: &[u8]) -> Self {
        self.bridge.set_bytes(address, bytes);
        self
    }

    pub fn game_id(self, id: &str) -> Self {
        self.bytes(super::layout::header::GAME_ID, id.as_bytes())
    }

    /// Start already attached
    pub fn attached(mut self) -> Self {
        self.bridge.attached = true;
        self
    }

    pub fn attach_fails(mut self) -> Self {
        self.bridge.attach_succeeds = false;
        self
    }

    pub fn build(self) -> MockBridge {
        self.bridge
    }
}

impl Default for MockBridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
