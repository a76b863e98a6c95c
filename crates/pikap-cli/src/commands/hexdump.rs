//! Hexdump command implementation.
//!
//! Displays raw emulated memory in traditional hexdump format, useful for
//! locating flags and counters when writing a world table.
//!
//! # Output Format
//!
//! ```text
//! 0x80000000: 47 50 49 50 30 31 00 00  00 00 00 00 00 00 00 00  |GPIP01..........|
//! ```

use anyhow::{Result, bail};
use pikap_core::{DolphinBridge, MemoryBridge, MemoryDump};

use super::hex_utils::parse_hex_address;
use super::process_target;

/// Run the hexdump command
pub fn run(address: &str, size: usize, ascii: bool, pid: Option<u32>) -> Result<()> {
    let address = parse_hex_address(address)?;

    let mut bridge = DolphinBridge::new(process_target(pid));
    if !bridge.attach() {
        bail!("Could not attach to Dolphin");
    }

    let dump = MemoryDump::capture(&bridge, address, size)?;
    bridge.detach();

    println!("Hexdump at {:#010X} ({} bytes):", address, size);
    println!();
    print!("{}", dump.to_hex(ascii));

    Ok(())
}
