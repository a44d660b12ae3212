//! Position tracking

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a simulated position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Open,
    ClosedStopLoss,
    ClosedTakeProfit,
}

impl PositionState {
    pub fn is_open(self) -> bool {
        self == PositionState::Open
    }
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PositionState::Open => "open",
            PositionState::ClosedStopLoss => "stop-loss",
            PositionState::ClosedTakeProfit => "take-profit",
        };
        f.write_str(label)
    }
}

/// Stop-loss and take-profit levels, both in quote currency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitThresholds {
    pub max_loss: Decimal,
    pub target_profit: Decimal,
}

impl ExitThresholds {
    pub fn new(max_loss: Decimal, target_profit: Decimal) -> Self {
        Self {
            max_loss,
            target_profit,
        }
    }

    /// State a position with unrealized `pnl` should be in.
    ///
    /// Both bounds are inclusive and stop-loss is checked first, so it wins
    /// when degenerate thresholds make both conditions true.
    pub fn evaluate(&self, pnl: Decimal) -> PositionState {
        if pnl <= -self.max_loss {
            PositionState::ClosedStopLoss
        } else if pnl >= self.target_profit {
            PositionState::ClosedTakeProfit
        } else {
            PositionState::Open
        }
    }
}

/// Unrealized P&L of a long position.
///
/// `size` already carries the leverage, so it is not applied again here.
/// Returns `None` when the result does not fit in a `Decimal`.
pub fn unrealized_pnl(entry_price: Decimal, size: Decimal, price: Decimal) -> Option<Decimal> {
    price.checked_sub(entry_price)?.checked_mul(size)
}

/// A simulated long position on one symbol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Traded pair
    pub symbol: String,
    /// Price observed when the position was opened
    pub entry_price: Decimal,
    /// Quantity of the base asset
    pub size: Decimal,
    /// Lifecycle state
    pub state: PositionState,
    /// Most recent unrealized P&L; frozen once closed
    pub last_pnl: Decimal,
    /// Open timestamp
    pub opened_at: DateTime<Utc>,
    /// Close timestamp
    pub closed_at: Option<DateTime<Utc>>,
    /// Price that triggered the close
    pub exit_price: Option<Decimal>,
}

impl Position {
    /// Open a position worth `notional` at `entry_price`.
    ///
    /// Returns `None` unless both the entry price and the resulting size are
    /// strictly positive.
    pub fn open(
        symbol: impl Into<String>,
        entry_price: Decimal,
        notional: Decimal,
        opened_at: DateTime<Utc>,
    ) -> Option<Self> {
        if entry_price <= dec!(0) {
            return None;
        }
        let size = notional.checked_div(entry_price)?;
        if size <= dec!(0) {
            return None;
        }

        Some(Self {
            symbol: symbol.into(),
            entry_price,
            size,
            state: PositionState::Open,
            last_pnl: dec!(0),
            opened_at,
            closed_at: None,
            exit_price: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Unrealized P&L at `price`, `None` on overflow
    pub fn pnl_at(&self, price: Decimal) -> Option<Decimal> {
        unrealized_pnl(self.entry_price, self.size, price)
    }

    /// Mark the position to `price` and apply the exit rule.
    ///
    /// Closed positions are left untouched. Returns the state after marking,
    /// or `None` if the P&L at `price` overflows, in which case nothing changes.
    pub fn mark(
        &mut self,
        price: Decimal,
        thresholds: &ExitThresholds,
        at: DateTime<Utc>,
    ) -> Option<PositionState> {
        if !self.is_open() {
            return Some(self.state);
        }

        let pnl = self.pnl_at(price)?;
        self.last_pnl = pnl;
        self.state = thresholds.evaluate(pnl);

        if !self.is_open() {
            self.closed_at = Some(at);
            self.exit_price = Some(price);
        }
        Some(self.state)
    }
}
