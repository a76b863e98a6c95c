//! Validate command implementation.

use anyhow::Result;
use pikap_core::{ItemAction, WorldTable};

/// Print a summary of an already validated world table
pub fn run(table: &WorldTable) -> Result<()> {
    println!("=== World Table ===");
    println!("Game:     {} ({})", table.game(), table.game_id());

    let auth = table.auth();
    println!("Auth:     {:#010X} ({} bytes)", auth.address, auth.length);
    println!(
        "In game:  {}",
        if table.in_game().is_some() { "gated" } else { "always" }
    );
    println!(
        "Goal:     {}",
        if table.goal().is_some() { "watched" } else { "none" }
    );
    println!("Checks:   {}", table.checks().len());

    let mut increments = 0;
    let mut bits = 0;
    let mut inert = 0;
    for effect in table.items() {
        match effect.action {
            ItemAction::Increment { .. } => increments += 1,
            ItemAction::SetBit { .. } => bits += 1,
            ItemAction::Nothing => inert += 1,
        }
    }
    println!(
        "Items:    {} ({} increment, {} set-bit, {} no-op)",
        table.items().len(),
        increments,
        bits,
        inert
    );
    println!();
    println!("✓ World table is valid");

    Ok(())
}
