//! Configuration management for ethprobe
//!
//! Handles CLI argument parsing, config file loading, and defaults.
//! Precedence is CLI flag, then config file, then built-in default.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::thresholds::Thresholds;

pub const DEFAULT_BEACON_URL: &str = "http://localhost:5052";
pub const DEFAULT_EXECUTION_URL: &str = "http://localhost:8545";
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Argument error: {0}")]
    Cli(#[from] clap::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ethprobe")]
#[command(about = "Health probe for Ethereum beacon and execution nodes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Beacon node REST URL
    #[arg(long)]
    pub beacon: Option<String>,

    /// Execution node JSON-RPC URL
    #[arg(long, visible_alias = "sepolia")]
    pub execution: Option<String>,

    /// Per-attempt timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Attempts per connection test and per request
    #[arg(long)]
    pub retries: Option<u32>,

    /// Monitor mode: re-run the probe every N seconds until Ctrl+C
    #[arg(long, value_name = "SECONDS")]
    pub monitor: Option<u64>,

    /// TOML config file; CLI flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Disable ANSI colors in the report
    #[arg(long)]
    pub no_color: bool,

    /// Write Prometheus text metrics to this file after each run
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
}

/// Network the execution node is expected to serve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub expected_chain_id: u64,
    pub name: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            expected_chain_id: SEPOLIA_CHAIN_ID,
            name: "Sepolia".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub beacon_url: String,
    pub execution_url: String,
    pub timeout_secs: u64,
    pub retries: u32,
    pub monitor_interval_secs: Option<u64>,
    pub log_level: String,
    pub color: bool,
    pub metrics_file: Option<PathBuf>,
    pub thresholds: Thresholds,
    pub network: NetworkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            beacon_url: DEFAULT_BEACON_URL.to_string(),
            execution_url: DEFAULT_EXECUTION_URL.to_string(),
            timeout_secs: 15,
            retries: 3,
            monitor_interval_secs: None,
            log_level: "warn".to_string(),
            color: true,
            metrics_file: None,
            thresholds: Thresholds::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Config {
    /// Create config from process arguments
    pub fn from_cli() -> Result<Self, ConfigError> {
        Self::resolve(Cli::parse())
    }

    /// Create config from an explicit argument list (first item is the binary name)
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Cli::try_parse_from(args)?)
    }

    /// Load config from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge parsed CLI flags over the file (or default) config and validate
    pub fn resolve(cli: Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::load_from_file(path)?,
            None => Config::default(),
        };

        if let Some(url) = cli.beacon {
            config.beacon_url = url;
        }
        if let Some(url) = cli.execution {
            config.execution_url = url;
        }
        if let Some(timeout) = cli.timeout {
            config.timeout_secs = timeout;
        }
        if let Some(retries) = cli.retries {
            config.retries = retries;
        }
        if cli.monitor.is_some() {
            config.monitor_interval_secs = cli.monitor;
        }
        if let Some(level) = cli.log_level {
            config.log_level = level;
        }
        if cli.no_color {
            config.color = false;
        }
        if cli.metrics_file.is_some() {
            config.metrics_file = cli.metrics_file;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retries == 0 {
            return Err(ConfigError::Invalid("retries must be at least 1".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout must be at least 1 second".to_string()));
        }
        if self.monitor_interval_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "monitor interval must be at least 1 second".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.thresholds.timeout_fraction) {
            return Err(ConfigError::Invalid(
                "timeout_fraction must be between 0 and 1".to_string(),
            ));
        }
        self.thresholds
            .beacon_peers
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("beacon_peers: {}", e)))?;
        self.thresholds
            .execution_peers
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("execution_peers: {}", e)))?;
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn monitor_interval(&self) -> Option<Duration> {
        self.monitor_interval_secs.map(Duration::from_secs)
    }
}
