//! Hex address parsing for the debug commands.

use anyhow::Result;

/// Parse a hex address string (with or without 0x prefix).
///
/// Unlike world tables, bare digits are read as hex here.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_hex_address("0x80001800").unwrap(), 0x8000_1800);
/// assert_eq!(parse_hex_address("80001800").unwrap(), 0x8000_1800);
/// ```
pub fn parse_hex_address(s: &str) -> Result<u32> {
    let s = s.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).map_err(|e| anyhow::anyhow!("Invalid hex address {:?}: {}", s, e))
}
