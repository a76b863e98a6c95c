//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pikap")]
#[command(about = "Archipelago multiworld client for Pikmin on Dolphin", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the client (default)
    Run(RunArgs),

    /// Attach once and print the running game id and slot name
    Probe {
        #[command(flatten)]
        world: WorldArgs,

        /// Dolphin process id (auto-detected when omitted)
        #[arg(long)]
        pid: Option<u32>,
    },

    /// Load and validate a world table
    Validate {
        #[command(flatten)]
        world: WorldArgs,
    },

    /// Dump raw emulated memory
    Hexdump {
        /// Emulated address (hex, e.g. 0x80000000)
        address: String,

        /// Number of bytes to read
        #[arg(short, long, default_value = "256")]
        size: usize,

        /// Show the ASCII column
        #[arg(short, long)]
        ascii: bool,

        #[arg(long)]
        pid: Option<u32>,
    },
}

#[derive(Args, Clone, Default)]
pub struct RunArgs {
    /// Server address (host:port or ws:// / wss:// URL)
    #[arg(long, env = "PIKAP_SERVER")]
    pub connect: Option<String>,

    /// Room password
    #[arg(long, env = "PIKAP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[command(flatten)]
    pub world: WorldArgs,

    /// Client config file (default: ./pikap.toml, then the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub pid: Option<u32>,
}

#[derive(Args, Clone, Default)]
pub struct WorldArgs {
    /// World table JSON (built-in Pikmin table when omitted)
    #[arg(long)]
    pub world: Option<PathBuf>,
}
