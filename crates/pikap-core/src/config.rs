//! Client configuration (`pikap.toml`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::memory::layout::timing;

pub const DEFAULT_CONFIG_FILE: &str = "pikap.toml";
pub const DEFAULT_PORT: u16 = 38281;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub timing: TimingConfig,
    /// Path of the world table; the built-in table is used when unset
    pub world: Option<PathBuf>,
    /// Directory for TSV logs of sent checks and received items; no log when unset
    pub session_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `host:port` or a full `ws://` / `wss://` URL
    pub endpoint: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_interval_ms: u64,
    pub retry_delay_secs: u64,
    pub network_retry_delay_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: timing::POLL_INTERVAL_MS,
            retry_delay_secs: timing::RETRY_DELAY_SECS,
            network_retry_delay_secs: timing::NETWORK_RETRY_DELAY_SECS,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn network_retry_delay(&self) -> Duration {
        Duration::from_secs(self.network_retry_delay_secs)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.timing.poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".to_string()));
        }
        Ok(())
    }
}

/// Turn a user-supplied endpoint into a WebSocket URL.
///
/// A bare `host` gets the default port; a missing scheme means `ws://`.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    let (scheme, rest) = match endpoint.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("ws", endpoint),
    };
    let rest = rest.trim_end_matches('/');
    let host_part = rest.split('/').next().unwrap_or(rest);
    let has_port = match host_part.rsplit_once(':') {
        // Bracketed IPv6 literal without a port
        Some((_, port)) if port.ends_with(']') => false,
        Some((_, port)) => port.parse::<u16>().is_ok(),
        None => false,
    };
    if has_port {
        format!("{}://{}", scheme, rest)
    } else {
        format!("{}://{}:{}", scheme, rest, DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.endpoint, None);
        assert_eq!(config.timing.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.timing.retry_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            session_dir = "sessions"

            [server]
            endpoint = "archipelago.gg:38281"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.endpoint.as_deref(), Some("archipelago.gg:38281"));
        assert_eq!(config.server.password, None);
        assert_eq!(config.session_dir, Some(PathBuf::from("sessions")));
        assert_eq!(config.timing, TimingConfig::default());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let result = Config::from_toml("[timing]\npoll_interval_ms = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(Config::from_toml("[server"), Err(Error::Toml(_))));
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let err = Config::load("/nonexistent/pikap.toml").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_load_from_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[timing]\nretry_delay_secs = 2").unwrap();
        let config = Config::load(temp.path()).unwrap();
        assert_eq!(config.timing.retry_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("localhost"), "ws://localhost:38281");
        assert_eq!(
            normalize_endpoint("archipelago.gg:51234"),
            "ws://archipelago.gg:51234"
        );
        assert_eq!(
            normalize_endpoint("wss://archipelago.gg:51234/"),
            "wss://archipelago.gg:51234"
        );
        assert_eq!(normalize_endpoint("wss://example.com"), "wss://example.com:38281");
    }
}
