//! paper-watch: paper-trading monitor for leveraged long positions
//!
//! This library provides the core components for:
//! - Latest-price snapshots from Binance
//! - Opening simulated leveraged longs from one snapshot
//! - Polling valuation with stop-loss / take-profit exits
//! - Structured logging and Prometheus metrics

pub mod cli;
pub mod config;
pub mod feed;
pub mod monitor;
pub mod telemetry;
