//! Run command implementation

use crate::config::Config;
use crate::feed::BinanceTickerSource;
use crate::monitor::{Monitor, RunOutcome, RunSummary, TracingSink};
use anyhow::Context;
use clap::Args;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override the configured symbols (comma-separated, e.g. OP/USDT,TAO/USDT)
    #[arg(short, long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut monitor_config = config.monitor.clone();
        if !self.symbols.is_empty() {
            monitor_config.symbols = self.symbols.clone();
        }

        let source = BinanceTickerSource::with_config(&config.feed)
            .context("Failed to create Binance price source")?;
        let mut monitor = Monitor::from_config(&monitor_config, source, TracingSink)
            .context("Invalid monitor configuration")?;

        tracing::info!(
            symbols = monitor_config.symbols.len(),
            leverage = %monitor.settings().leverage,
            margin_per_trade = %monitor.settings().margin_per_trade,
            "Starting paper trading monitor"
        );

        let outcome = tokio::select! {
            outcome = monitor.run() => Some(outcome),
            _ = tokio::signal::ctrl_c() => None,
        };

        match outcome {
            Some(RunOutcome::Completed(summary)) => report(&summary),
            Some(RunOutcome::NoPositionsOpened) => {
                tracing::info!("No positions opened, exiting");
            }
            None => {
                tracing::warn!(
                    open_positions = monitor.open_count(),
                    "Interrupted before all positions closed"
                );
                report(&monitor.summary());
            }
        }

        Ok(())
    }
}

fn report(summary: &RunSummary) {
    for position in &summary.positions {
        tracing::info!(
            symbol = %position.symbol,
            state = %position.state,
            entry_price = %position.entry_price,
            exit_price = ?position.exit_price,
            pnl = %position.last_pnl.round_dp(2),
            "Position result"
        );
    }

    tracing::info!(
        ticks = summary.ticks,
        fetch_failures = summary.fetch_failures,
        stop_losses = summary.stop_losses,
        take_profits = summary.take_profits,
        realized_pnl = %summary.realized_pnl.round_dp(2),
        "Simulation finished"
    );
}
