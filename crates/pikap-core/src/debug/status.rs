use std::fmt;

use crate::memory::MemoryBridge;
use crate::memory::layout::header;
use crate::probe::{IdentityProbe, ProbeOutcome, decode_game_id, decode_slot_name};
use crate::world::WorldTable;

/// What the emulator is currently running, for the `probe` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub expected: String,
    /// Game id as read; `None` if memory was unreachable
    pub game_id: Option<String>,
    pub outcome: ProbeOutcome,
    /// Slot name in the auth region; `None` if blank or unreadable
    pub slot_name: Option<String>,
}

impl ProbeReport {
    pub fn collect<B: MemoryBridge + ?Sized>(bridge: &B, table: &WorldTable) -> Self {
        let outcome = IdentityProbe::new(table.game_id()).verify(bridge);
        let game_id = bridge
            .read(header::GAME_ID, header::GAME_ID_LEN)
            .ok()
            .map(|raw| decode_game_id(&raw));

        let auth = table.auth();
        let slot_name = bridge
            .read(auth.address, auth.length)
            .ok()
            .and_then(|raw| decode_slot_name(&raw));

        Self {
            expected: table.game_id().to_string(),
            game_id,
            outcome,
            slot_name,
        }
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Expected game: {}", self.expected)?;
        match &self.game_id {
            Some(id) if id.is_empty() => writeln!(f, "Running game:  (none)")?,
            Some(id) => writeln!(f, "Running game:  {}", id)?,
            None => writeln!(f, "Running game:  (unreadable)")?,
        }
        let verdict = match &self.outcome {
            ProbeOutcome::Confirmed => "confirmed",
            ProbeOutcome::WrongImage { .. } => "wrong image",
            ProbeOutcome::Unreachable => "unreachable",
        };
        writeln!(f, "Identity:      {}", verdict)?;
        write!(
            f,
            "Slot name:     {}",
            self.slot_name.as_deref().unwrap_or("(not set)")
        )
    }
}
