//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/aimeter/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/aimeter/` (~/.config/aimeter/)
//! - Data: `$XDG_DATA_HOME/aimeter/` (~/.local/share/aimeter/)
//! - State/Logs: `$XDG_STATE_HOME/aimeter/` (~/.local/state/aimeter/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

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

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Question detection timings
    #[serde(default)]
    pub detector: DetectorConfig,

    /// Background dispatcher settings
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Storage location override
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Timings used by the in-page question detectors
#[derive(Debug, Deserialize, Clone)]
pub struct DetectorConfig {
    /// Quiet period after the last mutation before the message list is diffed
    #[serde(default = "default_quiescence_ms")]
    pub quiescence_ms: u64,

    /// Delay before the first stabilization sample after page load
    #[serde(default = "default_stabilize_initial_delay_ms")]
    pub stabilize_initial_delay_ms: u64,

    /// Delay between stabilization samples
    #[serde(default = "default_stabilize_interval_ms")]
    pub stabilize_interval_ms: u64,

    /// Maximum stabilization samples before giving up and seeding anyway
    #[serde(default = "default_stabilize_max_attempts")]
    pub stabilize_max_attempts: u32,

    /// Window in which an identical submission text is treated as a duplicate
    #[serde(default = "default_submission_quiet_window_ms")]
    pub submission_quiet_window_ms: u64,

    /// Delay between accepting a submission gesture and notifying
    #[serde(default = "default_notify_delay_ms")]
    pub notify_delay_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            quiescence_ms: default_quiescence_ms(),
            stabilize_initial_delay_ms: default_stabilize_initial_delay_ms(),
            stabilize_interval_ms: default_stabilize_interval_ms(),
            stabilize_max_attempts: default_stabilize_max_attempts(),
            submission_quiet_window_ms: default_submission_quiet_window_ms(),
            notify_delay_ms: default_notify_delay_ms(),
        }
    }
}

impl DetectorConfig {
    pub fn quiescence(&self) -> Duration {
        Duration::from_millis(self.quiescence_ms)
    }

    pub fn submission_quiet_window(&self) -> Duration {
        Duration::from_millis(self.submission_quiet_window_ms)
    }

    pub fn notify_delay(&self) -> Duration {
        Duration::from_millis(self.notify_delay_ms)
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.stabilize_max_attempts == 0 {
            return Err(Error::Config(
                "detector.stabilize_max_attempts must be at least 1".to_string(),
            ));
        }
        if self.quiescence_ms == 0 {
            return Err(Error::Config(
                "detector.quiescence_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_quiescence_ms() -> u64 {
    500
}

fn default_stabilize_initial_delay_ms() -> u64 {
    2000
}

fn default_stabilize_interval_ms() -> u64 {
    1000
}

fn default_stabilize_max_attempts() -> u32 {
    4
}

fn default_submission_quiet_window_ms() -> u64 {
    1000
}

fn default_notify_delay_ms() -> u64 {
    300
}

/// Background dispatcher configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DispatcherConfig {
    /// Per-site window in which repeated question notifications are dropped
    #[serde(default = "default_question_debounce_ms")]
    pub question_debounce_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            question_debounce_ms: default_question_debounce_ms(),
        }
    }
}

impl DispatcherConfig {
    pub fn question_debounce(&self) -> Duration {
        Duration::from_millis(self.question_debounce_ms)
    }
}

fn default_question_debounce_ms() -> u64 {
    2000
}

/// Storage configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct StorageConfig {
    /// Override path for the SQLite file
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
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
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate all sections
    pub fn validate(&self) -> Result<()> {
        self.detector.validate()
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/aimeter/config.toml` (~/.config/aimeter/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("aimeter").join("config.toml")
    }

    /// Returns the data directory path (for SQLite database)
    ///
    /// `$XDG_DATA_HOME/aimeter/` (~/.local/share/aimeter/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("aimeter")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/aimeter/` (~/.local/state/aimeter/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("aimeter")
    }

    /// Returns the default database file path
    ///
    /// `$XDG_DATA_HOME/aimeter/usage.db` (~/.local/share/aimeter/usage.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("usage.db")
    }

    /// Database path honoring `[storage] path` when set
    pub fn resolved_database_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(Self::database_path)
    }
}
