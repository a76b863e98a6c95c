//! CLI command implementations.
//!
//! This module contains the implementation of each CLI command.

pub mod hex_utils;
pub mod hexdump;
pub mod probe;
pub mod run;
pub mod validate;

use pikap_core::ProcessTarget;

/// `--pid` if given, otherwise the first Dolphin process found
pub(crate) fn process_target(pid: Option<u32>) -> ProcessTarget {
    pid.map(ProcessTarget::Pid).unwrap_or_default()
}
