mod cli;
mod commands;
mod input;
mod settings;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pikap=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        None => run(&cli.run),
        Some(Command::Run(args)) => run(&args),
        Some(Command::Probe { world, pid }) => {
            let config = settings::load_config(None);
            let table = settings::load_world(world.world.as_deref(), &config)?;
            commands::probe::run(&table, pid)
        }
        Some(Command::Validate { world }) => {
            let config = settings::load_config(None);
            let table = settings::load_world(world.world.as_deref(), &config)?;
            commands::validate::run(&table)
        }
        Some(Command::Hexdump {
            address,
            size,
            ascii,
            pid,
        }) => commands::hexdump::run(&address, size, ascii, pid),
    }
}

fn run(args: &cli::RunArgs) -> Result<()> {
    let config = settings::load_config(args.config.as_deref());
    let table = settings::load_world(args.world.world.as_deref(), &config)?;
    commands::run::run(args, &config, table)
}
