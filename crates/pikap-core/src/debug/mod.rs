//! Debug utilities for inspecting emulated memory
//!
//! This module provides tools for:
//! - Dumping raw memory (`MemoryDump`)
//! - Reporting what the emulator is running (`ProbeReport`)

mod dump;
mod status;

pub use dump::{MemoryDump, format_hex_dump};
pub use status::ProbeReport;
