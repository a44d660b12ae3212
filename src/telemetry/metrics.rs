//! Prometheus metrics

use std::net::SocketAddr;

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Positions still open
    OpenPositions,
    /// Unrealized P&L across open positions
    UnrealizedPnl,
    /// Realized P&L across closed positions
    RealizedPnl,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Completed polling ticks
    Ticks,
    /// Failed price fetches
    FetchFailures,
    /// Positions closed by stop-loss or take-profit
    PositionsClosed,
}

impl GaugeMetric {
    pub fn name(self) -> &'static str {
        match self {
            GaugeMetric::OpenPositions => "paperwatch_open_positions",
            GaugeMetric::UnrealizedPnl => "paperwatch_unrealized_pnl",
            GaugeMetric::RealizedPnl => "paperwatch_realized_pnl",
        }
    }
}

impl CounterMetric {
    pub fn name(self) -> &'static str {
        match self {
            CounterMetric::Ticks => "paperwatch_ticks_total",
            CounterMetric::FetchFailures => "paperwatch_fetch_failures_total",
            CounterMetric::PositionsClosed => "paperwatch_positions_closed_total",
        }
    }
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(metric.name()).set(value);
}

/// Increment a counter
pub fn increment_counter(metric: CounterMetric, value: u64) {
    ::metrics::counter!(metric.name()).increment(value);
}

/// Install the Prometheus recorder and serve `/metrics` on `port`.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Prometheus exporter listening");
    Ok(())
}
