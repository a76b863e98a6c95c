//! # pikap-core
//!
//! Core library for the pikap multiworld bridge.
//!
//! This crate provides:
//! - Dolphin process memory access (Windows and Linux)
//! - Game identity probing and memory condition tables
//! - Check detection and ordered item application
//! - An Archipelago WebSocket channel
//! - The client state machine tying them together
//!
//! ## Feature Flags
//!
//! - `debug-tools`: Enables raw memory dump helpers used by the CLI's
//!   `hexdump` command.

pub mod client;
pub mod config;
#[cfg(feature = "debug-tools")]
pub mod debug;
pub mod detector;
pub mod error;
pub mod items;
pub mod memory;
pub mod net;
pub mod probe;
pub mod retry;
pub mod signal;
pub mod status;
pub mod storage;
pub mod world;

pub use client::{Client, ClientConfig, ClientConfigBuilder};
pub use config::{Config, normalize_endpoint};
pub use detector::{CheckDetector, ReadPlan, ReportedSet, Snapshot};
pub use error::{Error, Result};
pub use items::{ItemApplier, PendingDelta};
pub use memory::{DolphinBridge, MemoryBridge, ProcessHandle, ProcessTarget};
pub use net::{ArchipelagoChannel, ChannelConfig, MessageChannel, ServerEvent};
pub use probe::{IdentityProbe, ProbeOutcome};
pub use retry::{FixedDelay, RetryStrategy};
pub use signal::{WaitOutcome, WakeSignal};
pub use status::{ConnectionStatus, StatusHandle};
pub use storage::{SessionEvent, SessionLog};
pub use world::{
    AuthRegion, CheckId, Condition, Evaluation, ItemAction, ItemEffect, WatchedCheck, WorldFile,
    WorldTable, parse_address,
};

// Debug utilities (requires debug-tools feature)
#[cfg(feature = "debug-tools")]
pub use debug::{MemoryDump, ProbeReport, format_hex_dump};
