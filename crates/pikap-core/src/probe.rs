use tracing::debug;

use crate::memory::MemoryBridge;
use crate::memory::layout::header;

/// Result of checking which game the emulator is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Confirmed,
    /// Another game (or none) is loaded; `found` is empty when the id is zeroed
    WrongImage { found: String },
    /// The id could not be read
    Unreachable,
}

/// Compares the game id in the disc header against the expected one.
#[derive(Debug, Clone)]
pub struct IdentityProbe {
    expected: String,
}

impl IdentityProbe {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn verify<B: MemoryBridge + ?Sized>(&self, bridge: &B) -> ProbeOutcome {
        let raw = match bridge.read(header::GAME_ID, header::GAME_ID_LEN) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Game id read failed: {}", e);
                return ProbeOutcome::Unreachable;
            }
        };

        if raw == self.expected.as_bytes() {
            return ProbeOutcome::Confirmed;
        }
        ProbeOutcome::WrongImage {
            found: decode_game_id(&raw),
        }
    }
}

/// Printable form of a raw game id; NUL padding is dropped.
pub fn decode_game_id(raw: &[u8]) -> String {
    raw.iter()
        .take_while(|&&b| b != 0)
        .map(|&b| {
            if b.is_ascii_graphic() {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}

/// Slot name stored NUL-terminated in the auth region; `None` while blank.
pub fn decode_slot_name(raw: &[u8]) -> Option<String> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let name = String::from_utf8_lossy(&raw[..end]).trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryBridge, MockBridgeBuilder};

    #[test]
    fn test_confirmed() {
        let bridge = MockBridgeBuilder::new().game_id("GPIP01").attached().build();
        assert_eq!(IdentityProbe::new("GPIP01").verify(&bridge), ProbeOutcome::Confirmed);
    }

    #[test]
    fn test_wrong_image() {
        let bridge = MockBridgeBuilder::new().game_id("WRONGID").attached().build();
        assert_eq!(
            IdentityProbe::new("GAME01").verify(&bridge),
            ProbeOutcome::WrongImage {
                found: "WRONGI".to_string()
            }
        );
    }

    #[test]
    fn test_zeroed_id_is_wrong_image() {
        let bridge = MockBridgeBuilder::new().attached().build();
        assert_eq!(
            IdentityProbe::new("GPIP01").verify(&bridge),
            ProbeOutcome::WrongImage {
                found: String::new()
            }
        );
    }

    #[test]
    fn test_unreachable_when_read_fails() {
        let mut bridge = MockBridgeBuilder::new().game_id("GPIP01").attached().build();
        bridge.lose_process();
        assert_eq!(IdentityProbe::new("GPIP01").verify(&bridge), ProbeOutcome::Unreachable);

        bridge.detach();
        assert_eq!(IdentityProbe::new("GPIP01").verify(&bridge), ProbeOutcome::Unreachable);
    }

    #[test]
    fn test_decode_game_id() {
        assert_eq!(decode_game_id(b"GPIP01"), "GPIP01");
        assert_eq!(decode_game_id(&[b'G', 0x01, b'P', 0, 0, 0]), "G.P");
    }

    #[test]
    fn test_decode_slot_name() {
        assert_eq!(decode_slot_name(b"Olimar Two\0\0junk").as_deref(), Some("Olimar Two"));
        assert_eq!(decode_slot_name(&[0; 16]), None);
        assert_eq!(decode_slot_name(b"   \0"), None);
        assert_eq!(decode_slot_name(b"Louie").as_deref(), Some("Louie"));
    }
}
