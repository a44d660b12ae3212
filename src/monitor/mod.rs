//! Position monitor
//!
//! Opens a fixed set of simulated leveraged longs from one price snapshot,
//! then polls the price source and closes each position once its unrealized
//! P&L crosses the stop-loss or take-profit level. Runs until nothing is open.

mod events;
mod position;

pub use events::{EventSink, MonitorEvent, Phase, TracingSink, UnavailableReason};
pub use position::{unrealized_pnl, ExitThresholds, Position, PositionState};

use crate::config::{ConfigError, MonitorConfig};
use crate::feed::{PriceSnapshot, PriceSource};
use crate::telemetry::{increment_counter, set_gauge, CounterMetric, GaugeMetric};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

/// Validated monitor parameters
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSettings {
    pub leverage: Decimal,
    pub margin_per_trade: Decimal,
    pub thresholds: ExitThresholds,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    notional: Decimal,
}

impl MonitorSettings {
    /// Validate monitor configuration
    pub fn from_config(config: &MonitorConfig) -> Result<Self, ConfigError> {
        let positive = |field: &'static str, value: Decimal| {
            if value > dec!(0) {
                Ok(value)
            } else {
                Err(ConfigError::NonPositive { field, value })
            }
        };

        let leverage = positive("leverage", config.leverage)?;
        let margin_per_trade = positive("margin_per_trade", config.margin_per_trade)?;
        let max_loss = positive("max_loss", config.max_loss)?;
        let target_profit = positive("target_profit", config.target_profit)?;

        if config.symbols.is_empty() {
            return Err(ConfigError::NoSymbols);
        }

        let notional = margin_per_trade
            .checked_mul(leverage)
            .ok_or(ConfigError::NotionalOverflow {
                leverage,
                margin_per_trade,
            })?;

        Ok(Self {
            leverage,
            margin_per_trade,
            thresholds: ExitThresholds::new(max_loss, target_profit),
            poll_interval: interval("poll_interval_secs", config.poll_interval_secs)?,
            error_backoff: interval("error_backoff_secs", config.error_backoff_secs)?,
            notional,
        })
    }

    /// Leveraged exposure of every trade
    pub fn notional(&self) -> Decimal {
        self.notional
    }
}

fn interval(field: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    if secs.is_finite() && secs > 0.0 {
        Ok(Duration::from_secs_f64(secs))
    } else {
        Err(ConfigError::InvalidInterval { field, value: secs })
    }
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// No symbol had a usable price at open time
    NoPositionsOpened,
    /// Every opened position reached a stop-loss or take-profit
    Completed(RunSummary),
}

/// Final report of a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Successful polling ticks
    pub ticks: u64,
    /// Failed price fetches, opening attempts included
    pub fetch_failures: u64,
    pub stop_losses: usize,
    pub take_profits: usize,
    /// Sum of P&L at which the positions closed
    pub realized_pnl: Decimal,
    pub positions: Vec<Position>,
}

/// Owns the simulated positions and drives them to completion
pub struct Monitor<P, S> {
    settings: MonitorSettings,
    symbols: Vec<String>,
    source: P,
    sink: S,
    positions: Vec<Position>,
    ticks: u64,
    fetch_failures: u64,
}

impl<P: PriceSource, S: EventSink> Monitor<P, S> {
    pub fn new(settings: MonitorSettings, symbols: Vec<String>, source: P, sink: S) -> Self {
        Self {
            settings,
            symbols,
            source,
            sink,
            positions: vec![],
            ticks: 0,
            fetch_failures: 0,
        }
    }

    /// Validate `config` and build a monitor from it
    pub fn from_config(config: &MonitorConfig, source: P, sink: S) -> Result<Self, ConfigError> {
        let settings = MonitorSettings::from_config(config)?;
        Ok(Self::new(settings, config.symbols.clone(), source, sink))
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn open_count(&self) -> usize {
        self.positions.iter().filter(|p| p.is_open()).count()
    }

    pub fn has_open_positions(&self) -> bool {
        self.positions.iter().any(Position::is_open)
    }

    /// Open one position per configured symbol priced in `snapshot`.
    ///
    /// Symbols without a strictly positive price are reported and skipped;
    /// repeated symbols are ignored. Returns the number of positions opened.
    /// Only the first call has any effect: the position set is fixed once
    /// initialized.
    pub fn open_positions(&mut self, snapshot: &PriceSnapshot) -> usize {
        if !self.positions.is_empty() {
            tracing::debug!("Positions already initialized, ignoring open request");
            return 0;
        }

        let notional = self.settings.notional();
        let opened_at = snapshot.fetched_at;

        for symbol in &self.symbols {
            if self.positions.iter().any(|p| &p.symbol == symbol) {
                tracing::debug!(%symbol, "Duplicate symbol, already opened");
                continue;
            }

            let price = match usable_price(snapshot, symbol) {
                Ok(price) => price,
                Err(reason) => {
                    self.sink.emit(MonitorEvent::SymbolUnavailable {
                        symbol: symbol.clone(),
                        phase: Phase::Open,
                        reason,
                    });
                    continue;
                }
            };

            let Some(position) = Position::open(symbol.clone(), price, notional, opened_at) else {
                self.sink.emit(MonitorEvent::SymbolUnavailable {
                    symbol: symbol.clone(),
                    phase: Phase::Open,
                    reason: UnavailableReason::UnsizablePrice(price),
                });
                continue;
            };

            self.sink.emit(MonitorEvent::PositionOpened {
                symbol: symbol.clone(),
                entry_price: position.entry_price,
                size: position.size,
                notional,
            });
            self.positions.push(position);
        }

        self.publish_gauges();
        self.positions.len()
    }

    /// Mark every open position against one shared snapshot and apply the
    /// exit rule. Returns the number of positions closed by this pass.
    pub fn revalue(&mut self, snapshot: &PriceSnapshot) -> usize {
        let thresholds = self.settings.thresholds;
        let at = snapshot.fetched_at;
        let mut closed = 0;

        for position in self.positions.iter_mut().filter(|p| p.is_open()) {
            let price = match usable_price(snapshot, &position.symbol) {
                Ok(price) => price,
                Err(reason) => {
                    self.sink.emit(MonitorEvent::SymbolUnavailable {
                        symbol: position.symbol.clone(),
                        phase: Phase::Revalue,
                        reason,
                    });
                    continue;
                }
            };

            let Some(state) = position.mark(price, &thresholds, at) else {
                self.sink.emit(MonitorEvent::SymbolUnavailable {
                    symbol: position.symbol.clone(),
                    phase: Phase::Revalue,
                    reason: UnavailableReason::PnlOverflow(price),
                });
                continue;
            };
            if !state.is_open() {
                closed += 1;
            }
            self.sink.emit(MonitorEvent::for_valuation(
                &position.symbol,
                price,
                position.last_pnl,
                state,
            ));
        }

        if closed > 0 {
            increment_counter(CounterMetric::PositionsClosed, closed as u64);
        }
        self.publish_gauges();
        closed
    }

    /// Open positions, then poll until every one of them is closed.
    ///
    /// Whole-call fetch failures never end the run: they are reported and
    /// retried after the error backoff without touching any position.
    pub async fn run(&mut self) -> RunOutcome {
        let snapshot = self.fetch_until_ok().await;
        if self.open_positions(&snapshot) == 0 {
            self.sink.emit(MonitorEvent::NoPositionsOpened);
            return RunOutcome::NoPositionsOpened;
        }

        tracing::info!(
            positions = self.positions.len(),
            poll_interval_secs = self.settings.poll_interval.as_secs_f64(),
            "Simulated positions opened, monitoring"
        );

        while self.has_open_positions() {
            match self.source.fetch_prices(&self.symbols).await {
                Ok(snapshot) => {
                    self.revalue(&snapshot);
                    self.ticks += 1;
                    increment_counter(CounterMetric::Ticks, 1);

                    let open_positions = self.open_count();
                    self.sink.emit(MonitorEvent::TickCompleted {
                        tick: self.ticks,
                        open_positions,
                    });

                    if open_positions > 0 {
                        tokio::time::sleep(self.settings.poll_interval).await;
                    }
                }
                Err(e) => self.report_fetch_failure(e).await,
            }
        }

        let summary = self.summary();
        self.sink.emit(MonitorEvent::AllClosed {
            realized_pnl: summary.realized_pnl,
        });
        RunOutcome::Completed(summary)
    }

    async fn fetch_until_ok(&mut self) -> PriceSnapshot {
        loop {
            match self.source.fetch_prices(&self.symbols).await {
                Ok(snapshot) => return snapshot,
                Err(e) => self.report_fetch_failure(e).await,
            }
        }
    }

    async fn report_fetch_failure(&mut self, error: anyhow::Error) {
        self.fetch_failures += 1;
        increment_counter(CounterMetric::FetchFailures, 1);
        self.sink.emit(MonitorEvent::FetchFailed {
            message: format!("{:#}", error),
            retry_in: self.settings.error_backoff,
        });
        tokio::time::sleep(self.settings.error_backoff).await;
    }

    /// Snapshot of the run so far
    pub fn summary(&self) -> RunSummary {
        let closed_with = |state: PositionState| {
            self.positions.iter().filter(|p| p.state == state).count()
        };

        RunSummary {
            ticks: self.ticks,
            fetch_failures: self.fetch_failures,
            stop_losses: closed_with(PositionState::ClosedStopLoss),
            take_profits: closed_with(PositionState::ClosedTakeProfit),
            realized_pnl: self.realized_pnl(),
            positions: self.positions.clone(),
        }
    }

    fn realized_pnl(&self) -> Decimal {
        self.positions
            .iter()
            .filter(|p| !p.is_open())
            .fold(dec!(0), |acc, p| acc.saturating_add(p.last_pnl))
    }

    fn unrealized_pnl(&self) -> Decimal {
        self.positions
            .iter()
            .filter(|p| p.is_open())
            .fold(dec!(0), |acc, p| acc.saturating_add(p.last_pnl))
    }

    fn publish_gauges(&self) {
        set_gauge(GaugeMetric::OpenPositions, self.open_count() as f64);
        set_gauge(
            GaugeMetric::UnrealizedPnl,
            self.unrealized_pnl().to_f64().unwrap_or_default(),
        );
        set_gauge(
            GaugeMetric::RealizedPnl,
            self.realized_pnl().to_f64().unwrap_or_default(),
        );
    }
}

/// Price of `symbol` if the snapshot has a strictly positive one
fn usable_price(snapshot: &PriceSnapshot, symbol: &str) -> Result<Decimal, UnavailableReason> {
    match snapshot.price(symbol) {
        None => Err(UnavailableReason::Missing),
        Some(price) if price <= dec!(0) => Err(UnavailableReason::NonPositive(price)),
        Some(price) => Ok(price),
    }
}
