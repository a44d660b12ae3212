//! Binance REST ticker price source

use super::{PriceSnapshot, PriceSource};
use crate::config::FeedConfig;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Latest-price endpoint, relative to the API base URL
const TICKER_PRICE_PATH: &str = "/api/v3/ticker/price";

/// One entry of the ticker price response
#[derive(Debug, Deserialize)]
struct BinanceTickerPrice {
    /// Exchange symbol (e.g., "OPUSDT")
    symbol: String,
    /// Last trade price as a decimal string
    price: String,
}

/// Price source backed by Binance's public ticker endpoint.
///
/// All tickers are fetched in a single request so every tracked symbol is
/// priced at the same instant, and an unknown symbol only makes that symbol
/// unavailable instead of failing the whole request.
pub struct BinanceTickerSource {
    base_url: String,
    client: Client,
}

impl BinanceTickerSource {
    /// Create a source from feed configuration
    pub fn with_config(config: &FeedConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn ticker_url(&self) -> String {
        format!("{}{}", self.base_url, TICKER_PRICE_PATH)
    }

    /// Parse a ticker price response into a snapshot keyed by the requested symbols
    fn parse_tickers(body: &str, symbols: &[String]) -> anyhow::Result<PriceSnapshot> {
        let tickers: Vec<BinanceTickerPrice> = serde_json::from_str(body)
            .map_err(|e| anyhow::anyhow!("Failed to decode ticker response: {}", e))?;

        let by_symbol: HashMap<String, String> = tickers
            .into_iter()
            .map(|t| (t.symbol, t.price))
            .collect();

        let mut snapshot = PriceSnapshot::new();
        for symbol in symbols {
            let price = by_symbol
                .get(&exchange_symbol(symbol))
                .and_then(|p| Decimal::from_str(p).ok());
            snapshot.insert(symbol.clone(), price);
        }

        Ok(snapshot)
    }
}

/// Map a `BASE/QUOTE` pair to Binance's concatenated symbol (e.g., "OP/USDT" -> "OPUSDT")
pub fn exchange_symbol(pair: &str) -> String {
    pair.chars()
        .filter(|c| *c != '/' && *c != '-')
        .collect::<String>()
        .to_uppercase()
}

#[async_trait]
impl PriceSource for BinanceTickerSource {
    async fn fetch_prices(&self, symbols: &[String]) -> anyhow::Result<PriceSnapshot> {
        let url = self.ticker_url();

        tracing::debug!(url = %url, symbols = symbols.len(), "Fetching Binance ticker prices");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Binance API error: {} - {}", status, body);
        }

        let body = response.text().await?;
        Self::parse_tickers(&body, symbols)
    }
}
