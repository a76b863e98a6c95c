//! Ordered application of received items to game memory.

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::memory::MemoryBridge;
use crate::world::{ItemAction, WorldTable};

/// One received item with its position in the server's item list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDelta {
    pub index: u64,
    pub item: i64,
    pub location: i64,
    /// Slot that sent the item
    pub player: i64,
    pub flags: u32,
}

/// Applies deltas strictly in index order and remembers how far it got.
#[derive(Debug, Default)]
pub struct ItemApplier {
    last_applied: Option<u64>,
}

impl ItemApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the last delta written, if any
    pub fn last_applied(&self) -> Option<u64> {
        self.last_applied
    }

    /// Index the next batch must start at
    pub fn next_index(&self) -> u64 {
        self.last_applied.map_or(0, |n| n + 1)
    }

    /// Drop the prefix of a full resend that was already applied.
    pub fn unapplied(&self, deltas: Vec<PendingDelta>) -> Vec<PendingDelta> {
        let next = self.next_index();
        deltas.into_iter().filter(|d| d.index >= next).collect()
    }

    /// Apply a contiguous batch.
    ///
    /// Fails with [`Error::OutOfOrder`] without touching memory when the batch
    /// does not continue exactly from the last applied index. A write failure
    /// stops the batch; `last_applied` then points at the last delta written.
    pub fn apply<B: MemoryBridge + ?Sized>(
        &mut self,
        bridge: &mut B,
        table: &WorldTable,
        deltas: &[PendingDelta],
    ) -> Result<usize> {
        let next = self.next_index();
        for (offset, delta) in deltas.iter().enumerate() {
            let expected = next + offset as u64;
            if delta.index != expected {
                return Err(Error::OutOfOrder {
                    expected,
                    actual: delta.index,
                });
            }
        }

        let mut applied = 0;
        for delta in deltas {
            apply_effect(bridge, table, delta)?;
            self.last_applied = Some(delta.index);
            applied += 1;
        }
        Ok(applied)
    }
}

fn apply_effect<B: MemoryBridge + ?Sized>(
    bridge: &mut B,
    table: &WorldTable,
    delta: &PendingDelta,
) -> Result<()> {
    let Some(effect) = table.item(delta.item) else {
        warn!(
            "Unknown item {} from player {} (index {}), nothing to write",
            delta.item, delta.player, delta.index
        );
        return Ok(());
    };

    match effect.action {
        ItemAction::Increment {
            address,
            width,
            amount,
            max,
        } => {
            let current = bridge.read_uint(address, width)?;
            let limit = max.unwrap_or(u32::MAX).min(width_max(width));
            // Never lowers a value that is already above the cap
            let value = current.saturating_add(amount).min(limit.max(current));
            bridge.write_uint(address, width, value)?;
            debug!("{:#010x}: {} -> {}", address, current, value);
        }
        ItemAction::SetBit { address, bit } => {
            let current = bridge.read_u8(address)?;
            bridge.write_u8(address, current | (1 << bit))?;
        }
        ItemAction::Nothing => {}
    }

    info!(
        "Received {} from player {} (index {})",
        effect.name, delta.player, delta.index
    );
    Ok(())
}

fn width_max(width: u8) -> u32 {
    match width {
        1 => u8::MAX as u32,
        2 => u16::MAX as u32,
        _ => u32::MAX,
    }
}
