use std::fmt::Write;

use crate::error::Result;
use crate::memory::MemoryBridge;

/// Raw bytes read from emulated memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDump {
    pub address: u32,
    pub bytes: Vec<u8>,
}

impl MemoryDump {
    pub fn capture<B: MemoryBridge + ?Sized>(bridge: &B, address: u32, size: usize) -> Result<Self> {
        Ok(Self {
            address,
            bytes: bridge.read(address, size)?,
        })
    }

    pub fn to_hex(&self, ascii: bool) -> String {
        format_hex_dump(self.address, &self.bytes, ascii)
    }
}

/// Traditional 16-bytes-per-line hexdump, one line per row:
///
/// ```text
/// 0x80000000: 47 50 49 50 30 31 00 00  00 00 00 00 00 00 00 00  |GPIP01..........|
/// ```
pub fn format_hex_dump(address: u32, bytes: &[u8], ascii: bool) -> String {
    let mut out = String::new();

    for (i, chunk) in bytes.chunks(16).enumerate() {
        let line_address = address.wrapping_add((i * 16) as u32);
        let _ = write!(out, "{:#010X}: ", line_address);

        for j in 0..16 {
            if j == 8 {
                out.push(' ');
            }
            match chunk.get(j) {
                Some(byte) => {
                    let _ = write!(out, "{:02X} ", byte);
                }
                None => out.push_str("   "),
            }
        }

        if ascii {
            out.push_str(" |");
            for &byte in chunk {
                out.push(if (0x20..0x7F).contains(&byte) {
                    byte as char
                } else {
                    '.'
                });
            }
            for _ in chunk.len()..16 {
                out.push(' ');
            }
            out.push('|');
        }

        // Drop the trailing space of the hex column
        let trimmed = out.trim_end_matches(' ').len();
        out.truncate(trimmed);
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockBridgeBuilder;

    #[test]
    fn test_full_line_with_ascii() {
        let dump = format_hex_dump(0x8000_0000, b"GPIP01\0\0\0\0\0\0\0\0\0\0", true);
        assert_eq!(
            dump,
            "0x80000000: 47 50 49 50 30 31 00 00  00 00 00 00 00 00 00 00  |GPIP01..........|\n"
        );
    }

    #[test]
    fn test_partial_line_is_padded() {
        let dump = format_hex_dump(0x8000_0010, &[0xAB, 0xCD], true);
        assert!(dump.starts_with("0x80000010: AB CD "));
        assert!(dump.ends_with("|..              |\n"));
    }

    #[test]
    fn test_without_ascii() {
        let dump = format_hex_dump(0x8000_0000, &[1; 17], false);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "0x80000010: 01");
    }

    #[test]
    fn test_capture() {
        let bridge = MockBridgeBuilder::new().game_id("GPIP01").attached().build();
        let dump = MemoryDump::capture(&bridge, 0x8000_0000, 6).unwrap();
        assert_eq!(dump.bytes, b"GPIP01");
    }
}
