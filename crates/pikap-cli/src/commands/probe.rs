//! Probe command: attach once and report what the emulator is running.

use anyhow::{Result, bail};
use pikap_core::{DolphinBridge, MemoryBridge, ProbeReport, WorldTable};

use super::process_target;

pub fn run(table: &WorldTable, pid: Option<u32>) -> Result<()> {
    let mut bridge = DolphinBridge::new(process_target(pid));
    if !bridge.attach() {
        bail!("Could not attach to Dolphin");
    }
    if let Some(pid) = bridge.pid() {
        println!("Dolphin pid:   {}", pid);
    }

    let report = ProbeReport::collect(&bridge, table);
    bridge.detach();

    println!("{}", report);
    Ok(())
}
