//! Main client mode command.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use pikap_core::{
    ArchipelagoChannel, ChannelConfig, Client, ClientConfig, Config, ConnectionStatus,
    DolphinBridge, FixedDelay, StatusHandle, WakeSignal, WorldTable,
};
use tracing::{debug, info};

use super::process_target;
use crate::cli::RunArgs;
use crate::input;
use crate::settings::Credentials;

/// Interval at which the status line is refreshed
const STATUS_POLL: Duration = Duration::from_millis(200);

/// Run the bridge until Ctrl+C, Esc or q
pub fn run(args: &RunArgs, config: &Config, table: WorldTable) -> Result<()> {
    let credentials = Credentials::resolve(args, config);
    let Some(endpoint) = credentials.endpoint else {
        bail!("No server given; pass --connect, set PIKAP_SERVER or add [server] endpoint to the config");
    };

    // Shutdown and wake-ups share one signal
    let wake = Arc::new(WakeSignal::new());
    let wake_ctrlc = Arc::clone(&wake);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        wake_ctrlc.trigger();
    })?;

    let _keyboard_handle = input::spawn_keyboard_monitor(Arc::clone(&wake));

    info!("pikap {}", env!("CARGO_PKG_VERSION"));

    let timing = config.timing;
    let channel = ArchipelagoChannel::connect(
        ChannelConfig {
            endpoint,
            password: credentials.password,
            game: table.game().to_string(),
            retry: FixedDelay(timing.network_retry_delay()),
        },
        Arc::clone(&wake),
    )
    .context("Failed to start the server connection")?;
    debug!("Server URL: {}", channel.url());

    let mut client_config = ClientConfig::builder()
        .poll_interval(timing.poll_interval())
        .retry_delay(timing.retry_delay());
    if let Some(dir) = &config.session_dir {
        client_config = client_config.session_dir(dir);
    }

    let bridge = DolphinBridge::new(process_target(args.pid));
    let mut client = Client::new(bridge, channel, table, client_config.build(), Arc::clone(&wake));
    let status = client.status();

    println!("Waiting for Dolphin... (Press Esc or q to quit)");
    let worker = thread::Builder::new()
        .name("pikap-client".to_string())
        .spawn(move || client.run())?;

    report_status(&status, &worker);

    if worker.join().is_err() {
        bail!("Client thread panicked");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Print each status change until the client thread exits.
///
/// Polls instead of waiting on the wake signal, which belongs to the client.
fn report_status(status: &StatusHandle, worker: &JoinHandle<()>) {
    let mut seen = None;
    loop {
        let (state, message, generation) = status.snapshot();
        if seen != Some(generation) {
            seen = Some(generation);
            println!("{} {}", paint(state), message);
        }
        if worker.is_finished() {
            break;
        }
        thread::sleep(STATUS_POLL);
    }
}

fn paint(state: ConnectionStatus) -> String {
    let label = format!("[{}]", state);
    match state {
        ConnectionStatus::Synced => label.green().to_string(),
        ConnectionStatus::WrongImage => label.red().to_string(),
        ConnectionStatus::Connected | ConnectionStatus::Authenticating => {
            label.yellow().to_string()
        }
        _ => label.dimmed().to_string(),
    }
}
