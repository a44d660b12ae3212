//! Price feed module
//!
//! Latest trade prices for a set of symbols, fetched on demand

mod binance;
mod types;

pub use binance::{exchange_symbol, BinanceTickerSource};
pub use types::PriceSnapshot;

use async_trait::async_trait;

/// Trait for price source implementations
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the latest price for every requested symbol.
    ///
    /// A symbol without a price is reported as unavailable inside the
    /// snapshot. An `Err` means the whole call failed.
    async fn fetch_prices(&self, symbols: &[String]) -> anyhow::Result<PriceSnapshot>;
}
