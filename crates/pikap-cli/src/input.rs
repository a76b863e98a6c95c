//! Quit keys for the interactive `run` mode.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::tty::IsTty;
use pikap_core::WakeSignal;
use tracing::debug;

/// How often the monitor rechecks the shutdown flag between key events
const KEY_POLL: Duration = Duration::from_millis(100);

/// Watch stdin for Esc / q and trigger shutdown on the client's wake signal.
///
/// Returns `None` when stdin is not a terminal (service or piped input); Ctrl+C
/// is then the only way out.
pub fn spawn_keyboard_monitor(signal: Arc<WakeSignal>) -> Option<JoinHandle<()>> {
    if !io::stdin().is_tty() {
        debug!("stdin is not a terminal, keyboard quit disabled");
        return None;
    }

    let spawned = thread::Builder::new()
        .name("pikap-keys".to_string())
        .spawn(move || {
            while !signal.is_shutdown() {
                match event::poll(KEY_POLL) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        debug!("Keyboard monitor stopped: {}", e);
                        break;
                    }
                }
                if let Ok(Event::Key(key)) = event::read()
                    && let Some(reason) = quit_reason(&key)
                {
                    debug!("Quit requested ({})", reason);
                    signal.trigger();
                }
            }
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            debug!("Keyboard monitor not started: {}", e);
            None
        }
    }
}

/// Which quit key was pressed, if any. Releases and repeats are ignored
/// so a single press on Windows is not seen twice.
fn quit_reason(key: &KeyEvent) -> Option<&'static str> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Esc => Some("Esc"),
        KeyCode::Char('q' | 'Q') => Some("q"),
        // Raw-mode terminals deliver Ctrl+C as a key instead of a signal
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some("Ctrl+C"),
        _ => None,
    }
}
