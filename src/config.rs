//! Configuration types for paper-watch

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Position monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Leverage applied to the margin of every trade
    pub leverage: Decimal,

    /// Margin committed per trade (quote currency)
    pub margin_per_trade: Decimal,

    /// Loss in quote currency that closes a position
    pub max_loss: Decimal,

    /// Profit in quote currency that closes a position
    pub target_profit: Decimal,

    /// Pairs to open, written BASE/QUOTE
    pub symbols: Vec<String>,

    /// Delay between polling ticks (seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: f64,

    /// Delay after a failed price fetch (seconds)
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: f64,
}

fn default_poll_interval_secs() -> f64 {
    10.0
}
fn default_error_backoff_secs() -> f64 {
    5.0
}

/// Price feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.binance.com".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port, disabled when absent
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            metrics_port: None,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

/// Invalid configuration, detected before the monitor starts
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: Decimal },
    #[error("no symbols configured")]
    NoSymbols,
    #[error("{field} must be a positive number of seconds, got {value}")]
    InvalidInterval { field: &'static str, value: f64 },
    #[error("notional of margin_per_trade {margin_per_trade} at leverage {leverage} is too large")]
    NotionalOverflow {
        leverage: Decimal,
        margin_per_trade: Decimal,
    },
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
