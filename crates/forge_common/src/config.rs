//! Configuration for godot-forge.
//!
//! Loads settings from ~/.config/godot-forge/config.toml or uses defaults.
//! Every knob has a default matching the editor plugin's shipped values.

use crate::error::ForgeError;
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Godot Editor host
    #[serde(default = "default_host")]
    pub host: String,

    /// Editor plugin WebSocket port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds to wait for a reply to a sent command
    #[serde(default = "default_response_timeout")]
    pub response_timeout_secs: u64,

    /// Fixed delay between reconnect attempts
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: f64,

    /// Keep-alive ping cadence
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,

    /// Seconds of silence before the connection is considered dead
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_secs: u64,

    /// Maximum retries per command
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff base delay in seconds
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_secs: f64,

    /// Backoff delay cap in seconds
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_secs: f64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8765
}

fn default_response_timeout() -> u64 {
    30
}

fn default_reconnect_delay() -> f64 {
    2.0
}

fn default_ping_interval() -> u64 {
    5
}

fn default_ping_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_base_delay() -> f64 {
    1.0
}

fn default_retry_max_delay() -> f64 {
    10.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            response_timeout_secs: default_response_timeout(),
            reconnect_delay_secs: default_reconnect_delay(),
            ping_interval_secs: default_ping_interval(),
            ping_timeout_secs: default_ping_timeout(),
            max_retries: default_max_retries(),
            retry_base_delay_secs: default_retry_base_delay(),
            retry_max_delay_secs: default_retry_max_delay(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist and parse; the default location is
    /// optional and silently falls back to defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ForgeError> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match Self::default_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if required {
                return Err(ForgeError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| ForgeError::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded config from {}", path.display());

        if config.max_retries == 0 {
            warn!("max_retries is 0; every failed command is terminal");
        }
        Ok(config)
    }

    /// Default config location under the user's config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("godot-forge").join("config.toml"))
    }

    /// WebSocket URL of the editor plugin.
    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs_f64(self.reconnect_delay_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_secs_f64(self.retry_base_delay_secs),
            max_delay: Duration::from_secs_f64(self.retry_max_delay_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_shipped_plugin() {
        let config = Config::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 8765);
        assert_eq!(config.response_timeout_secs, 30);
        assert_eq!(config.reconnect_delay_secs, 2.0);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.url(), "ws://localhost:8765");
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host = \"editor.lan\"\nport = 9000").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.host, "editor.lan");
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.ping_interval_secs, 5);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/forge.toml")));
        assert!(matches!(result, Err(ForgeError::Config(_))));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();
        assert!(matches!(
            Config::load(Some(file.path())),
            Err(ForgeError::Config(_))
        ));
    }

    #[test]
    fn retry_policy_reflects_config() {
        let config = Config {
            max_retries: 3,
            retry_base_delay_secs: 0.5,
            retry_max_delay_secs: 4.0,
            ..Default::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay, Duration::from_secs_f64(0.5));
        assert_eq!(policy.max_delay, Duration::from_secs(4));
    }
}
