//! Integration tests for the polling monitor

use async_trait::async_trait;
use paper_watch::config::MonitorConfig;
use paper_watch::feed::{PriceSnapshot, PriceSource};
use paper_watch::monitor::{Monitor, MonitorEvent, Phase, PositionState, RunOutcome, UnavailableReason};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Serves a fixed sequence of fetch results and records when each call happened
struct ScriptedSource {
    script: Mutex<VecDeque<anyhow::Result<PriceSnapshot>>>,
    calls: Arc<Mutex<Vec<Instant>>>,
}

impl ScriptedSource {
    fn new(script: Vec<anyhow::Result<PriceSnapshot>>) -> (Self, Arc<Mutex<Vec<Instant>>>) {
        let calls = Arc::new(Mutex::new(vec![]));
        let source = Self {
            script: Mutex::new(script.into()),
            calls: calls.clone(),
        };
        (source, calls)
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn fetch_prices(&self, _symbols: &[String]) -> anyhow::Result<PriceSnapshot> {
        self.calls.lock().unwrap().push(Instant::now());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("price script exhausted")
    }
}

fn config(symbols: &[&str]) -> MonitorConfig {
    MonitorConfig {
        leverage: dec!(10),
        margin_per_trade: dec!(1000),
        max_loss: dec!(50),
        target_profit: dec!(100),
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        poll_interval_secs: 10.0,
        error_backoff_secs: 5.0,
    }
}

fn prices(entries: &[(&str, Decimal)]) -> anyhow::Result<PriceSnapshot> {
    Ok(entries
        .iter()
        .fold(PriceSnapshot::new(), |s, (symbol, price)| s.with_price(*symbol, *price)))
}

/// Seconds since the first fetch, for every fetch
fn offsets(calls: &Arc<Mutex<Vec<Instant>>>) -> Vec<u64> {
    let calls = calls.lock().unwrap();
    calls.iter().map(|t| (*t - calls[0]).as_secs()).collect()
}

#[tokio::test(start_paused = true)]
async fn test_run_closes_every_position() {
    let (source, calls) = ScriptedSource::new(vec![
        prices(&[("X/USDT", dec!(1.0)), ("Y/USDT", dec!(1.0))]),
        prices(&[("X/USDT", dec!(1.0049)), ("Y/USDT", dec!(1.005))]),
        prices(&[("X/USDT", dec!(0.995)), ("Y/USDT", dec!(1.006))]),
        prices(&[("X/USDT", dec!(0.5)), ("Y/USDT", dec!(1.01))]),
    ]);
    let mut monitor = Monitor::from_config(&config(&["X/USDT", "Y/USDT"]), source, Vec::new()).unwrap();

    let summary = match monitor.run().await {
        RunOutcome::Completed(summary) => summary,
        RunOutcome::NoPositionsOpened => panic!("expected positions to open"),
    };

    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.fetch_failures, 0);
    assert_eq!(summary.stop_losses, 1);
    assert_eq!(summary.take_profits, 1);
    assert_eq!(summary.realized_pnl, dec!(50));

    // Opening fetch and first tick are back to back, then one poll interval apart,
    // and nothing is fetched after the last close
    assert_eq!(offsets(&calls), vec![0, 0, 10, 20]);

    // X closed on tick 2 and ignored the 0.5 print on tick 3
    let x = monitor.position("X/USDT").unwrap();
    assert_eq!(x.state, PositionState::ClosedStopLoss);
    assert_eq!(x.last_pnl, dec!(-50));
    assert_eq!(x.exit_price, Some(dec!(0.995)));

    let y = monitor.position("Y/USDT").unwrap();
    assert_eq!(y.state, PositionState::ClosedTakeProfit);
    assert_eq!(y.last_pnl, dec!(100));

    assert_eq!(
        monitor.sink().last(),
        Some(&MonitorEvent::AllClosed {
            realized_pnl: dec!(50)
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_backs_off_without_mutation() {
    let (source, calls) = ScriptedSource::new(vec![
        prices(&[("X/USDT", dec!(1.0))]),
        prices(&[("X/USDT", dec!(1.001))]),
        prices(&[("X/USDT", dec!(1.002))]),
        Err(anyhow::anyhow!("connection reset")),
        prices(&[("X/USDT", dec!(1.01))]),
    ]);
    let mut monitor = Monitor::from_config(&config(&["X/USDT"]), source, Vec::new()).unwrap();

    let RunOutcome::Completed(summary) = monitor.run().await else {
        panic!("expected a completed run");
    };

    assert_eq!(summary.ticks, 3);
    assert_eq!(summary.fetch_failures, 1);
    // Failed attempt at 20s, retry after the 5s backoff instead of 10s
    assert_eq!(offsets(&calls), vec![0, 0, 10, 20, 25]);

    let events = monitor.sink();
    let failed_at = events
        .iter()
        .position(|e| e.kind() == "fetch_failed")
        .unwrap();

    // Position state after tick 2 is what the failed tick left behind
    assert_eq!(
        events[failed_at - 2],
        MonitorEvent::Valuation {
            symbol: "X/USDT".to_string(),
            price: dec!(1.002),
            pnl: dec!(20),
        }
    );
    assert_eq!(
        events[failed_at - 1],
        MonitorEvent::TickCompleted {
            tick: 2,
            open_positions: 1
        }
    );
    assert!(matches!(
        &events[failed_at],
        MonitorEvent::FetchFailed { message, retry_in }
            if message.contains("connection reset") && retry_in.as_secs() == 5
    ));
    assert_eq!(
        events[failed_at + 1],
        MonitorEvent::TakeProfitHit {
            symbol: "X/USDT".to_string(),
            price: dec!(1.01),
            pnl: dec!(100),
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_no_positions_opened_skips_polling() {
    let (source, calls) = ScriptedSource::new(vec![prices(&[("X/USDT", dec!(1.0))])]);
    let mut monitor = Monitor::from_config(&config(&["Y/USDT"]), source, Vec::new()).unwrap();

    let outcome = monitor.run().await;

    assert!(matches!(outcome, RunOutcome::NoPositionsOpened));
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert!(monitor.positions().is_empty());
    assert_eq!(
        monitor.sink().as_slice(),
        &[
            MonitorEvent::SymbolUnavailable {
                symbol: "Y/USDT".to_string(),
                phase: Phase::Open,
                reason: UnavailableReason::Missing,
            },
            MonitorEvent::NoPositionsOpened,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_opening_fetch_is_retried() {
    let (source, calls) = ScriptedSource::new(vec![
        Err(anyhow::anyhow!("HTTP 503")),
        prices(&[("X/USDT", dec!(2.0))]),
        prices(&[("X/USDT", dec!(1.98))]),
    ]);
    let mut monitor = Monitor::from_config(&config(&["X/USDT"]), source, Vec::new()).unwrap();

    let RunOutcome::Completed(summary) = monitor.run().await else {
        panic!("expected a completed run");
    };

    assert_eq!(offsets(&calls), vec![0, 5, 5]);
    assert_eq!(summary.fetch_failures, 1);
    assert_eq!(summary.ticks, 1);
    // size 5000, -0.02 per unit
    assert_eq!(summary.positions[0].last_pnl, dec!(-100));
    assert_eq!(summary.stop_losses, 1);
}

#[tokio::test(start_paused = true)]
async fn test_missing_price_leaves_position_open() {
    let (source, _calls) = ScriptedSource::new(vec![
        prices(&[("X/USDT", dec!(1.0)), ("Y/USDT", dec!(1.0))]),
        prices(&[("Y/USDT", dec!(1.02))]),
        Ok(PriceSnapshot::new()
            .with_unavailable("X/USDT")
            .with_price("Y/USDT", dec!(3))),
        prices(&[("X/USDT", dec!(0.99))]),
    ]);
    let mut monitor = Monitor::from_config(&config(&["X/USDT", "Y/USDT"]), source, Vec::new()).unwrap();

    let RunOutcome::Completed(summary) = monitor.run().await else {
        panic!("expected a completed run");
    };

    assert_eq!(summary.ticks, 3);
    assert_eq!(monitor.position("Y/USDT").unwrap().last_pnl, dec!(200));
    assert_eq!(monitor.position("X/USDT").unwrap().last_pnl, dec!(-100));

    let unavailable = monitor
        .sink()
        .iter()
        .filter(|e| e.kind() == "symbol_unavailable")
        .count();
    assert_eq!(unavailable, 2);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_bounded_by_last_crossing() {
    let symbols = ["A/USDT", "B/USDT", "C/USDT"];
    let open = prices(&[("A/USDT", dec!(1)), ("B/USDT", dec!(1)), ("C/USDT", dec!(1))]);
    let mut script = vec![open];
    // A crosses on tick 1, B on tick 4, C on tick 6
    for tick in 1..=6u32 {
        let a = if tick == 1 { dec!(1.02) } else { dec!(1) };
        let b = if tick == 4 { dec!(0.99) } else { dec!(1) };
        let c = if tick == 6 { dec!(1.01) } else { dec!(1.001) };
        script.push(prices(&[("A/USDT", a), ("B/USDT", b), ("C/USDT", c)]));
    }
    let (source, calls) = ScriptedSource::new(script);
    let mut monitor = Monitor::from_config(&config(&symbols), source, Vec::new()).unwrap();

    let RunOutcome::Completed(summary) = monitor.run().await else {
        panic!("expected a completed run");
    };

    assert_eq!(summary.ticks, 6);
    assert_eq!(calls.lock().unwrap().len(), 7);
    assert!(!monitor.has_open_positions());
}
