//! Integration tests for configuration loading and validation

use paper_watch::config::{Config, ConfigError};
use paper_watch::monitor::MonitorSettings;
use rust_decimal_macros::dec;
use std::io::Write;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

#[test]
fn test_example_config_is_valid() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = assert_ok!(Config::load(path));

    assert_eq!(config.monitor.symbols.len(), 10);
    assert_eq!(config.monitor.symbols[0], "OM/USDT");

    let settings = assert_ok!(MonitorSettings::from_config(&config.monitor));
    assert_eq!(settings.notional(), dec!(10000));
    assert_eq!(settings.thresholds.max_loss, dec!(50));
    assert_eq!(settings.thresholds.target_profit, dec!(100));
    assert_eq!(settings.poll_interval, Duration::from_secs(10));
    assert_eq!(settings.error_backoff, Duration::from_secs(5));
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [monitor]
        leverage = 3
        margin_per_trade = 250.5
        max_loss = 20
        target_profit = 40
        symbols = ["OP/USDT"]
        error_backoff_secs = 1.5
        "#
    )
    .unwrap();

    let config = assert_ok!(Config::load(file.path()));
    let settings = assert_ok!(MonitorSettings::from_config(&config.monitor));
    assert_eq!(settings.notional(), dec!(751.5));
    assert_eq!(settings.error_backoff, Duration::from_millis(1500));
}

#[test]
fn test_invalid_file_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[monitor]\nleverage = \"ten\"\n").unwrap();

    assert_err!(Config::load(file.path()));
}

#[test]
fn test_non_positive_margin_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [monitor]
        leverage = 10
        margin_per_trade = 0
        max_loss = 50
        target_profit = 100
        symbols = ["OP/USDT"]
        "#
    )
    .unwrap();

    let config = assert_ok!(Config::load(file.path()));
    let err = assert_err!(MonitorSettings::from_config(&config.monitor));
    assert_eq!(
        err,
        ConfigError::NonPositive {
            field: "margin_per_trade",
            value: dec!(0)
        }
    );
}
