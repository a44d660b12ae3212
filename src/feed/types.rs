//! Price feed types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Latest prices for a set of symbols, taken by one source call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Price per symbol; `None` marks a symbol the source could not price
    prices: HashMap<String, Option<Decimal>>,
    /// Local timestamp when the snapshot was taken
    pub fetched_at: DateTime<Utc>,
}

impl PriceSnapshot {
    /// Create an empty snapshot stamped with the current time
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Builder-style insert of an available price
    pub fn with_price(mut self, symbol: impl Into<String>, price: Decimal) -> Self {
        self.insert(symbol, Some(price));
        self
    }

    /// Builder-style insert of an unavailable marker
    pub fn with_unavailable(mut self, symbol: impl Into<String>) -> Self {
        self.insert(symbol, None);
        self
    }

    /// Record the price (or unavailability) of a symbol
    pub fn insert(&mut self, symbol: impl Into<String>, price: Option<Decimal>) {
        self.prices.insert(symbol.into(), price);
    }

    /// Price reported for `symbol`, if any.
    ///
    /// Symbols never requested and symbols marked unavailable both yield
    /// `None`. The value is returned as reported; callers decide whether it
    /// is usable.
    pub fn price(&self, symbol: &str) -> Option<Decimal> {
        self.prices.get(symbol).copied().flatten()
    }

    /// Number of symbols in the snapshot, priced or not
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Whether the snapshot has no entries
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl Default for PriceSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
