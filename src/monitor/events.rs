//! Monitor events and sinks

use super::PositionState;
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;

/// Phase in which a price was looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Open,
    Revalue,
}

/// Why a symbol could not be priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnavailableReason {
    /// Source had no price for the symbol
    Missing,
    /// Source reported a zero or negative price
    NonPositive(Decimal),
    /// Notional at this price gives no representable positive size
    UnsizablePrice(Decimal),
    /// P&L at this price does not fit in a `Decimal`
    PnlOverflow(Decimal),
}

/// Something the monitor observed or decided
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MonitorEvent {
    PositionOpened {
        symbol: String,
        entry_price: Decimal,
        size: Decimal,
        notional: Decimal,
    },
    SymbolUnavailable {
        symbol: String,
        phase: Phase,
        reason: UnavailableReason,
    },
    Valuation {
        symbol: String,
        price: Decimal,
        pnl: Decimal,
    },
    StopLossHit {
        symbol: String,
        price: Decimal,
        pnl: Decimal,
    },
    TakeProfitHit {
        symbol: String,
        price: Decimal,
        pnl: Decimal,
    },
    NoPositionsOpened,
    FetchFailed {
        message: String,
        retry_in: Duration,
    },
    TickCompleted {
        tick: u64,
        open_positions: usize,
    },
    AllClosed {
        realized_pnl: Decimal,
    },
}

impl MonitorEvent {
    /// Short machine-readable name of the event
    pub fn kind(&self) -> &'static str {
        match self {
            MonitorEvent::PositionOpened { .. } => "position_opened",
            MonitorEvent::SymbolUnavailable { .. } => "symbol_unavailable",
            MonitorEvent::Valuation { .. } => "valuation",
            MonitorEvent::StopLossHit { .. } => "stop_loss_hit",
            MonitorEvent::TakeProfitHit { .. } => "take_profit_hit",
            MonitorEvent::NoPositionsOpened => "no_positions_opened",
            MonitorEvent::FetchFailed { .. } => "fetch_failed",
            MonitorEvent::TickCompleted { .. } => "tick_completed",
            MonitorEvent::AllClosed { .. } => "all_closed",
        }
    }

    /// Event reporting a valuation that left the position in `state`
    pub(crate) fn for_valuation(
        symbol: &str,
        price: Decimal,
        pnl: Decimal,
        state: PositionState,
    ) -> Self {
        let symbol = symbol.to_string();
        match state {
            PositionState::Open => MonitorEvent::Valuation { symbol, price, pnl },
            PositionState::ClosedStopLoss => MonitorEvent::StopLossHit { symbol, price, pnl },
            PositionState::ClosedTakeProfit => MonitorEvent::TakeProfitHit { symbol, price, pnl },
        }
    }
}

/// Destination for monitor events
pub trait EventSink {
    fn emit(&mut self, event: MonitorEvent);
}

/// Collects events in memory
impl EventSink for Vec<MonitorEvent> {
    fn emit(&mut self, event: MonitorEvent) {
        self.push(event);
    }
}

/// Writes every event as a structured `tracing` record
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: MonitorEvent) {
        let _span = tracing::info_span!("monitor_event", kind = event.kind()).entered();

        match event {
            MonitorEvent::PositionOpened {
                symbol,
                entry_price,
                size,
                notional,
            } => {
                tracing::info!(%symbol, %entry_price, %size, %notional, "Opened simulated position");
            }
            MonitorEvent::SymbolUnavailable {
                symbol,
                phase,
                reason,
            } => match reason {
                UnavailableReason::Missing => {
                    tracing::warn!(%symbol, ?phase, "No current price, skipping");
                }
                UnavailableReason::NonPositive(price) => {
                    tracing::warn!(%symbol, ?phase, %price, "Invalid price, skipping");
                }
                UnavailableReason::UnsizablePrice(price) => {
                    tracing::warn!(%symbol, ?phase, %price, "No representable position size, skipping");
                }
                UnavailableReason::PnlOverflow(price) => {
                    tracing::warn!(%symbol, ?phase, %price, "P&L out of range, skipping");
                }
            },
            MonitorEvent::Valuation { symbol, price, pnl } => {
                tracing::info!(%symbol, %price, pnl = %pnl.round_dp(2), "Position marked");
            }
            MonitorEvent::StopLossHit { symbol, price, pnl } => {
                tracing::info!(%symbol, %price, pnl = %pnl.round_dp(2), "STOP LOSS hit");
            }
            MonitorEvent::TakeProfitHit { symbol, price, pnl } => {
                tracing::info!(%symbol, %price, pnl = %pnl.round_dp(2), "TAKE PROFIT hit");
            }
            MonitorEvent::NoPositionsOpened => {
                tracing::warn!("No positions were opened, nothing to monitor");
            }
            MonitorEvent::FetchFailed { message, retry_in } => {
                tracing::warn!(error = %message, retry_in_secs = retry_in.as_secs_f64(), "Price fetch failed");
            }
            MonitorEvent::TickCompleted {
                tick,
                open_positions,
            } => {
                tracing::debug!(tick, open_positions, "Tick completed");
            }
            MonitorEvent::AllClosed { realized_pnl } => {
                tracing::info!(realized_pnl = %realized_pnl.round_dp(2), "All simulated positions closed");
            }
        }
    }
}
