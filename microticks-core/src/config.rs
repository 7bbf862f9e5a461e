//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/microticks/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/microticks/` (~/.config/microticks/)
//! - State/Logs: `$XDG_STATE_HOME/microticks/` (~/.local/state/microticks/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Host sentinel that disables network I/O and simulates successful
/// dispatch. See [`TrackerConfig::is_dummy`].
pub const DUMMY_HOST: &str = "dummy";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Tracker endpoint and identity
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tracker endpoint configuration
///
/// `host` is the Microticks server base URL (e.g. `http://localhost:5000`)
/// or the [`DUMMY_HOST`] sentinel, which short-circuits all network I/O
/// while keeping queue behavior intact.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TrackerConfig {
    /// Microticks server base URL, or `"dummy"` for offline mode
    #[serde(default)]
    pub host: String,

    /// Opaque key identifying this deployment to the server
    #[serde(default)]
    pub consumer_key: String,

    /// Log every dispatched request at debug level
    #[serde(default)]
    pub debug: bool,
}

impl TrackerConfig {
    /// True when the host is the offline sentinel.
    pub fn is_dummy(&self) -> bool {
        self.host == DUMMY_HOST
    }

    /// Check if the tracker is properly configured
    pub fn is_ready(&self) -> bool {
        !self.host.is_empty() && (self.is_dummy() || !self.consumer_key.is_empty())
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Config("tracker.host is required".to_string()));
        }
        if !self.is_dummy() && self.consumer_key.is_empty() {
            return Err(Error::Config(
                "tracker.consumer_key is required unless tracker.host is \"dummy\"".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/microticks/config.toml` (~/.config/microticks/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("microticks").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/microticks/` (~/.local/state/microticks/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("microticks")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/microticks/microticks.log` (~/.local/state/microticks/microticks.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("microticks.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
