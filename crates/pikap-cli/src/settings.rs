//! Resolution of config file, world table and server credentials.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pikap_core::config::DEFAULT_CONFIG_FILE;
use pikap_core::{Config, WorldTable};
use tracing::{debug, info, warn};

use crate::cli::RunArgs;

/// `./pikap.toml` if present, otherwise `<config dir>/pikap/pikap.toml`
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }
    dirs::config_dir()
        .map(|dir| dir.join("pikap").join(DEFAULT_CONFIG_FILE))
        .unwrap_or(local)
}

/// Load the client config, falling back to defaults when it is missing or broken.
pub fn load_config(path: Option<&Path>) -> Config {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    match Config::load(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) if e.is_not_found() => {
            debug!("No config file at {}, using defaults", path.display());
            Config::default()
        }
        Err(e) => {
            warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        }
    }
}

/// World table from `--world`, then the config file, then the built-in table.
///
/// A table that fails validation is fatal.
pub fn load_world(cli_path: Option<&Path>, config: &Config) -> Result<WorldTable> {
    match cli_path.or(config.world.as_deref()) {
        Some(path) => WorldTable::load(path)
            .with_context(|| format!("Failed to load world table {}", path.display())),
        None => {
            debug!("Using the built-in world table");
            Ok(WorldTable::builtin())
        }
    }
}

/// Server endpoint and password after applying precedence:
/// command line, then environment (both handled by clap), then config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub endpoint: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn resolve(args: &RunArgs, config: &Config) -> Self {
        Self {
            endpoint: args
                .connect
                .clone()
                .or_else(|| config.server.endpoint.clone()),
            password: args
                .password
                .clone()
                .or_else(|| config.server.password.clone()),
        }
    }
}
