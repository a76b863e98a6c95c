//! Edge detection of watched memory conditions.

use std::collections::HashSet;

use tracing::debug;

use crate::error::Result;
use crate::memory::MemoryBridge;
use crate::world::{CheckId, Condition, Evaluation, WorldTable};

/// Checks already sent (or queued) this session
pub type ReportedSet = HashSet<CheckId>;

/// Coalesced byte ranges covering every watched condition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadPlan {
    ranges: Vec<(u32, usize)>,
}

impl ReadPlan {
    /// Sort the spans and merge those that overlap or touch.
    pub fn new<I>(spans: I) -> Self
    where
        I: IntoIterator<Item = (u32, usize)>,
    {
        let mut spans: Vec<(u32, usize)> = spans.into_iter().filter(|&(_, len)| len > 0).collect();
        spans.sort_unstable();

        let mut ranges: Vec<(u32, usize)> = Vec::with_capacity(spans.len());
        for (start, len) in spans {
            let end = start as u64 + len as u64;
            if let Some((last_start, last_len)) = ranges.last_mut() {
                let last_end = *last_start as u64 + *last_len as u64;
                if start as u64 <= last_end {
                    *last_len = (end.max(last_end) - *last_start as u64) as usize;
                    continue;
                }
            }
            ranges.push((start, len));
        }
        Self { ranges }
    }

    pub fn from_table(table: &WorldTable) -> Self {
        Self::new(table.watched_conditions().filter_map(Condition::span))
    }

    pub fn ranges(&self) -> &[(u32, usize)] {
        &self.ranges
    }

    /// One bridge read per range.
    pub fn read<B: MemoryBridge + ?Sized>(&self, bridge: &B) -> Result<Snapshot> {
        let chunks = self
            .ranges
            .iter()
            .map(|&(start, len)| bridge.read(start, len).map(|bytes| (start, bytes)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Snapshot { chunks })
    }
}

/// Memory captured by one [`ReadPlan::read`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    /// Sorted, non-overlapping
    chunks: Vec<(u32, Vec<u8>)>,
}

impl Snapshot {
    pub fn byte_at(&self, address: u32) -> Option<u8> {
        let idx = match self.chunks.binary_search_by_key(&address, |(start, _)| *start) {
            Ok(i) => i,
            Err(0) => return None,
            Err(i) => i - 1,
        };
        let (start, bytes) = &self.chunks[idx];
        bytes.get((address - start) as usize).copied()
    }

    pub fn holds(&self, condition: &Condition) -> bool {
        condition.is_satisfied(|address| self.byte_at(address))
    }
}

/// Reports checks whose condition just became true.
///
/// Keeps the previous tick's results so a condition that stays true is only
/// reported on its rising edge, and consults the [`ReportedSet`] so nothing is
/// reported twice in a session even across reconnects.
#[derive(Debug)]
pub struct CheckDetector {
    plan: ReadPlan,
    /// Satisfaction per check on the previous tick; `None` before the first
    previous: Option<Vec<bool>>,
}

impl CheckDetector {
    pub fn new(table: &WorldTable) -> Self {
        Self {
            plan: ReadPlan::from_table(table),
            previous: None,
        }
    }

    pub fn plan(&self) -> &ReadPlan {
        &self.plan
    }

    /// Forget the previous tick; the next poll compares against nothing.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Read memory and return newly satisfied checks.
    pub fn poll<B: MemoryBridge + ?Sized>(
        &mut self,
        bridge: &B,
        table: &WorldTable,
        reported: &mut ReportedSet,
    ) -> Result<Vec<CheckId>> {
        let snapshot = self.plan.read(bridge)?;
        Ok(self.detect(table, &snapshot, reported))
    }

    /// Edge detection on an already captured snapshot.
    pub fn detect(
        &mut self,
        table: &WorldTable,
        snapshot: &Snapshot,
        reported: &mut ReportedSet,
    ) -> Vec<CheckId> {
        let in_game = table.in_game().is_none_or(|gate| snapshot.holds(gate));

        let current: Vec<bool> = table
            .checks()
            .iter()
            .map(|check| {
                let gated = match check.evaluation {
                    Evaluation::Always => true,
                    Evaluation::InGame => in_game,
                };
                gated && snapshot.holds(&check.condition)
            })
            .collect();

        let mut newly = Vec::new();
        for (i, check) in table.checks().iter().enumerate() {
            let was = self
                .previous
                .as_ref()
                .and_then(|prev| prev.get(i).copied())
                .unwrap_or(false);
            if current[i] && !was && reported.insert(check.id) {
                debug!("Check {} ({}) satisfied", check.id, check.name);
                newly.push(check.id);
            }
        }

        self.previous = Some(current);
        newly
    }
}
