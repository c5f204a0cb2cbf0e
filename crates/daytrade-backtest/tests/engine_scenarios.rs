//! End-to-end scenarios for the bar loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use daytrade_backtest::{BacktestConfig, BacktestEngine, JournalEvent, RunStatus};
use daytrade_core::error::EngineError;
use daytrade_core::traits::SignalGenerator;
use daytrade_core::types::{
    names, Bar, Direction, ExitReason, FeedItem, IndicatorSnapshot, Signal, SignalDirection,
};
use daytrade_execution::{ExecutionConfig, SameBarPolicy};
use daytrade_indicators::{build_feed, IndicatorParams};
use daytrade_risk::TrailingStopRule;
use daytrade_strategies::StrategySpec;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Emits scripted signals keyed by bar index.
struct Script {
    signals: Vec<(usize, SignalDirection)>,
    index: usize,
}

impl Script {
    fn new(signals: &[(usize, SignalDirection)]) -> Self {
        Self {
            signals: signals.to_vec(),
            index: 0,
        }
    }
}

impl SignalGenerator for Script {
    fn name(&self) -> &str {
        "script"
    }

    fn evaluate(&mut self, bar: &Bar, _indicators: &IndicatorSnapshot) -> Option<Signal> {
        let index = self.index;
        self.index += 1;
        self.signals
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, d)| Signal::new(bar.timestamp, *d, "scripted"))
    }

    fn reset(&mut self) {
        self.index = 0;
    }
}

/// Alternates long and short entries every 10 bars, with explicit exits.
struct Periodic {
    index: usize,
}

impl SignalGenerator for Periodic {
    fn name(&self) -> &str {
        "periodic"
    }

    fn evaluate(&mut self, bar: &Bar, _indicators: &IndicatorSnapshot) -> Option<Signal> {
        let index = self.index;
        self.index += 1;
        match index % 10 {
            0 if index % 20 == 0 => Some(Signal::long(bar.timestamp, "cycle")),
            0 => Some(Signal::short(bar.timestamp, "cycle")),
            5 => Some(Signal::new(bar.timestamp, SignalDirection::ExitLong, "cycle")),
            7 => Some(Signal::new(bar.timestamp, SignalDirection::ExitShort, "cycle")),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.index = 0;
    }
}

/// Records what it was shown and fails if time ever goes backwards.
#[derive(Default)]
struct Recorder {
    seen: Vec<i64>,
}

impl SignalGenerator for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn evaluate(&mut self, bar: &Bar, _indicators: &IndicatorSnapshot) -> Option<Signal> {
        if let Some(&last) = self.seen.last() {
            assert!(bar.timestamp > last, "bar {} after {}", bar.timestamp, last);
        }
        self.seen.push(bar.timestamp);
        None
    }
}

/// Sets the cancel flag once it has seen `after` bars.
struct Canceller {
    flag: Arc<AtomicBool>,
    after: usize,
    seen: usize,
}

impl SignalGenerator for Canceller {
    fn name(&self) -> &str {
        "canceller"
    }

    fn evaluate(&mut self, bar: &Bar, _indicators: &IndicatorSnapshot) -> Option<Signal> {
        self.seen += 1;
        if self.seen == self.after {
            self.flag.store(true, Ordering::Relaxed);
        }
        (self.seen == 1).then(|| Signal::long(bar.timestamp, "first bar"))
    }
}

fn item(ts: i64, open: f64, high: f64, low: f64, close: f64) -> FeedItem {
    FeedItem::new(
        Bar::new(ts, open, high, low, close, 10_000.0),
        IndicatorSnapshot::new().with(names::ATR, 2.5),
    )
}

fn wave(len: usize) -> Vec<Bar> {
    (0..len)
        .map(|i| {
            let t = i as f64;
            let close = 100.0 + (t * 0.21).sin() * 6.0 + (t * 0.05).cos() * 3.0;
            let open = close - (t * 0.9).sin() * 0.8;
            let high = open.max(close) + 0.7;
            let low = open.min(close) - 0.7;
            Bar::new(1_700_000_000_000 + i as i64 * 300_000, open, high, low, close, 25_000.0)
        })
        .collect()
}

fn wave_feed(len: usize) -> Vec<FeedItem> {
    build_feed(&wave(len), &IndicatorParams::default()).unwrap()
}

fn frictionless() -> BacktestConfig {
    BacktestConfig::default().with_execution(ExecutionConfig {
        fee_rate: Decimal::ZERO,
        flat_fee: Decimal::ZERO,
        slippage_rate: Decimal::ZERO,
        max_liquidity_fraction: Decimal::ONE,
    })
}

fn with_fees() -> BacktestConfig {
    BacktestConfig::default().with_execution(ExecutionConfig {
        fee_rate: dec!(0.001),
        flat_fee: Decimal::ZERO,
        slippage_rate: Decimal::ZERO,
        max_liquidity_fraction: Decimal::ONE,
    })
}

#[test]
fn test_take_profit_scenario() {
    // capital 10000, risk 1%, ATR 2.5 * 2 => stop 95, size 20, target 110
    let feed = vec![
        item(1, 100.0, 100.5, 99.5, 100.0),
        item(2, 100.0, 106.0, 98.0, 105.0),
        item(3, 105.0, 112.0, 104.0, 111.0),
    ];

    let run = BacktestEngine::new(frictionless()).run(&mut Script::new(&[(0, SignalDirection::Long)]), &feed);
    let trade = run.trades().next().unwrap();
    assert_eq!(trade.entry_price, dec!(100));
    assert_eq!(trade.size, dec!(20));
    assert_eq!(trade.exit_price, dec!(110));
    assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
    assert_eq!(trade.pnl, dec!(200));

    let run = BacktestEngine::new(with_fees()).run(&mut Script::new(&[(0, SignalDirection::Long)]), &feed);
    let trade = run.trades().next().unwrap();
    assert_eq!(trade.fees_paid, dec!(4.2));
    assert_eq!(trade.pnl, dec!(195.8));
    assert_eq!(run.account.capital, dec!(10195.8));
    assert_eq!(run.final_equity(), dec!(10195.8));
}

#[test]
fn test_same_bar_stop_first() {
    let feed = vec![
        item(1, 100.0, 100.5, 99.5, 100.0),
        item(2, 100.0, 111.0, 94.0, 100.0),
    ];

    let run = BacktestEngine::new(frictionless()).run(&mut Script::new(&[(0, SignalDirection::Long)]), &feed);
    let trade = run.trades().next().unwrap();
    assert_eq!(trade.exit_reason, ExitReason::StopLoss);
    assert_eq!(trade.exit_price, dec!(95));
    assert_eq!(trade.pnl, dec!(-100));

    let config = frictionless().with_same_bar_policy(SameBarPolicy::TargetFirst);
    let run = BacktestEngine::new(config).run(&mut Script::new(&[(0, SignalDirection::Long)]), &feed);
    assert_eq!(run.trades().next().unwrap().exit_reason, ExitReason::TakeProfit);
}

#[test]
fn test_short_position_lifecycle() {
    let feed = vec![
        item(1, 100.0, 100.5, 99.5, 100.0),
        item(2, 100.0, 101.0, 96.0, 97.0),
        item(3, 97.0, 98.0, 89.0, 90.0),
    ];

    let run = BacktestEngine::new(frictionless()).run(&mut Script::new(&[(0, SignalDirection::Short)]), &feed);
    let trade = run.trades().next().unwrap();
    assert_eq!(trade.direction, Direction::Short);
    assert_eq!(trade.exit_price, dec!(90));
    assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
    assert_eq!(trade.pnl, dec!(200));
}

#[test]
fn test_signal_exit_at_close() {
    let feed = vec![
        item(1, 100.0, 100.5, 99.5, 100.0),
        item(2, 100.0, 103.0, 99.0, 102.0),
        item(3, 102.0, 104.0, 101.0, 103.5),
    ];
    let mut strategy = Script::new(&[(0, SignalDirection::Long), (2, SignalDirection::ExitLong)]);

    let run = BacktestEngine::new(frictionless()).run(&mut strategy, &feed);
    let trade = run.trades().next().unwrap();
    assert_eq!(trade.exit_reason, ExitReason::Signal);
    assert_eq!(trade.exit_price, dec!(103.5));
    assert_eq!(trade.exit_time, 3);
    assert_eq!(trade.pnl, dec!(70));
}

#[test]
fn test_trailing_stop_exit() {
    let feed = vec![
        item(1, 100.0, 100.5, 99.5, 100.0),
        item(2, 104.5, 106.5, 104.0, 106.0),
        item(3, 106.0, 106.0, 102.0, 103.0),
    ];
    let config = frictionless().with_trailing(TrailingStopRule::Fraction { distance: dec!(0.02) });

    let run = BacktestEngine::new(config).run(&mut Script::new(&[(0, SignalDirection::Long)]), &feed);
    let trade = run.trades().next().unwrap();
    // 106 * (1 - 0.02) = 103.88
    assert_eq!(trade.exit_price, dec!(103.88));
    assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
    assert_eq!(trade.pnl, dec!(77.60));
}

#[test]
fn test_liquidity_rejection_is_journaled() {
    // capital 250000 at 1% over a 5.0 stop distance asks for 500 units;
    // 10% of 1000 volume allows 100
    let config = BacktestConfig::default()
        .with_capital(dec!(250000))
        .with_execution(ExecutionConfig {
            max_liquidity_fraction: dec!(0.1),
            ..ExecutionConfig::default()
        });
    let feed = vec![FeedItem::new(
        Bar::new(1, 100.0, 100.5, 99.5, 100.0, 1000.0),
        IndicatorSnapshot::new().with(names::ATR, 2.5),
    )];

    let run = BacktestEngine::new(config).run(&mut Script::new(&[(0, SignalDirection::Long)]), &feed);
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.trades().count(), 0);
    assert_eq!(run.bars_in_market, 0);

    let events = run.journal.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        JournalEvent::NoTrade(event) => {
            assert_eq!(event.timestamp, 1);
            assert_eq!(
                event.error,
                EngineError::InsufficientLiquidity {
                    requested: dec!(500),
                    max_allowed: dec!(100),
                }
            );
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(run.account.capital, dec!(250000));
}

#[test]
fn test_one_action_per_bar() {
    let feed = vec![
        item(1, 100.0, 100.5, 99.5, 100.0),
        item(2, 100.0, 101.0, 99.0, 100.0),
        item(3, 100.0, 101.0, 99.0, 101.0),
        item(4, 101.0, 102.0, 100.0, 101.0),
    ];
    // A repeated entry is ignored; the opposing signal only closes
    let mut strategy = Script::new(&[
        (0, SignalDirection::Long),
        (1, SignalDirection::Long),
        (2, SignalDirection::Short),
    ]);

    let run = BacktestEngine::new(frictionless()).run(&mut strategy, &feed);
    assert_eq!(run.journal.no_trades().count(), 0);
    let trades: Vec<_> = run.trades().collect();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].direction, Direction::Long);
    assert_eq!(trades[0].exit_reason, ExitReason::Signal);
    assert_eq!(trades[0].exit_time, 3);
    assert_eq!(run.bars_in_market, 2);
    assert_eq!(run.final_equity(), dec!(10020));
}

#[test]
fn test_replay_is_deterministic() {
    let feed = wave_feed(400);
    let engine = BacktestEngine::new(with_fees());

    let mut periodic = Periodic { index: 0 };
    let first = engine.run(&mut periodic, &feed);
    // Same generator instance: the engine resets it before each run
    let second = engine.run(&mut periodic, &feed);
    assert_eq!(first, second);
    assert!(first.trades().count() > 0);

    let mut a = StrategySpec::default().build().unwrap();
    let mut b = StrategySpec::default().build().unwrap();
    assert_eq!(engine.run(&mut a, &feed), engine.run(&mut b, &feed));
}

#[test]
fn test_pnl_identity_and_final_equity() {
    let feed = wave_feed(400);
    let config = BacktestConfig::default().with_trailing(TrailingStopRule::Fraction { distance: dec!(0.01) });
    let run = BacktestEngine::new(config).run(&mut Periodic { index: 0 }, &feed);
    assert_eq!(run.status, RunStatus::Completed);

    let mut total = Decimal::ZERO;
    for trade in run.trades() {
        let expected = (trade.exit_price - trade.entry_price) * trade.size * trade.direction.sign()
            - trade.fees_paid;
        assert_eq!(trade.pnl, expected);
        total += trade.pnl;
    }
    assert_eq!(run.account.capital, run.account.initial_capital + total);
    assert_eq!(run.final_equity(), run.account.initial_capital + total);
}

#[test]
fn test_equity_curve_and_single_position() {
    let feed = wave_feed(400);
    let run = BacktestEngine::new(with_fees()).run(&mut Periodic { index: 0 }, &feed);

    // One point per bar, plus one when a position is closed at the end
    let curve = &run.account.equity_curve;
    let closed_at_end = run
        .trades()
        .last()
        .is_some_and(|t| t.exit_reason == ExitReason::EndOfData);
    assert_eq!(curve.len(), feed.len() + usize::from(closed_at_end));
    assert!(curve.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert!(curve[..feed.len()]
        .windows(2)
        .all(|w| w[0].timestamp < w[1].timestamp));

    // Each trade opens strictly after the previous one closed
    let trades: Vec<_> = run.trades().collect();
    for pair in trades.windows(2) {
        assert!(pair[1].entry_time > pair[0].exit_time);
    }
    for trade in &trades {
        assert!(trade.size > Decimal::ZERO);
        assert!(trade.exit_time > trade.entry_time);
    }
}

#[test]
fn test_no_look_ahead() {
    let bars = wave(300);
    let full = build_feed(&bars, &IndicatorParams::default()).unwrap();

    // Indicators for a prefix do not change when later bars are added
    let prefix = build_feed(&bars[..120], &IndicatorParams::default()).unwrap();
    assert_eq!(prefix[..], full[..120]);

    // Nor does anything the engine did up to that point
    let config = BacktestConfig {
        close_at_end: false,
        ..with_fees()
    };
    let engine = BacktestEngine::new(config);
    let short_run = engine.run(&mut Periodic { index: 0 }, &full[..120]);
    let long_run = engine.run(&mut Periodic { index: 0 }, &full);

    assert_eq!(
        short_run.account.equity_curve[..],
        long_run.account.equity_curve[..120]
    );
    let cutoff = full[119].bar.timestamp;
    let early: Vec<_> = long_run.trades().filter(|t| t.exit_time <= cutoff).collect();
    let short_trades: Vec<_> = short_run.trades().collect();
    assert_eq!(short_trades, early);

    // Bars are shown once each, in order
    let mut recorder = Recorder::default();
    engine.run(&mut recorder, &full);
    let expected: Vec<i64> = full.iter().map(|f| f.bar.timestamp).collect();
    assert_eq!(recorder.seen, expected);
}

#[test]
fn test_data_gap_halts_without_force_close() {
    let feed = vec![
        item(1, 100.0, 100.5, 99.5, 100.0),
        item(2, 100.0, 102.0, 99.0, 101.0),
        item(2, 101.0, 120.0, 80.0, 101.0),
        item(4, 101.0, 102.0, 99.0, 101.0),
    ];

    let run = BacktestEngine::new(frictionless()).run(&mut Script::new(&[(0, SignalDirection::Long)]), &feed);
    assert!(run.truncated);
    assert_eq!(run.bars_processed, 2);
    assert_eq!(
        run.status,
        RunStatus::Halted {
            error: EngineError::data_gap(2, "timestamp not after previous bar at 2"),
        }
    );
    assert_eq!(run.trades().count(), 0);
    assert_eq!(run.account.capital, dec!(10000));
    // Last point still marks the open position at bar 2
    assert_eq!(run.final_equity(), dec!(10020));
}

#[test]
fn test_non_finite_bar_halts() {
    let mut feed = vec![item(1, 100.0, 100.5, 99.5, 100.0), item(2, 100.0, 101.0, 99.0, 100.0)];
    feed[1].bar.close = f64::NAN;

    let run = BacktestEngine::new(frictionless()).run(&mut Script::new(&[]), &feed);
    assert!(matches!(
        run.status,
        RunStatus::Halted {
            error: EngineError::DataGap { timestamp: 2, .. }
        }
    ));
    assert_eq!(run.account.equity_curve.len(), 1);
}

#[test]
fn test_cancellation_truncates_run() {
    let feed = wave_feed(50)
        .into_iter()
        .map(|mut f| {
            f.indicators.insert(names::ATR, 2.5);
            f
        })
        .collect::<Vec<_>>();
    let flag = Arc::new(AtomicBool::new(false));
    let mut strategy = Canceller {
        flag: Arc::clone(&flag),
        after: 3,
        seen: 0,
    };

    let run = BacktestEngine::new(frictionless()).run_until(&mut strategy, &feed, &flag);
    assert_eq!(run.status, RunStatus::Cancelled);
    assert!(run.truncated);
    assert_eq!(run.bars_processed, 3);
    assert_eq!(run.account.equity_curve.len(), 3);
    // An open position is left as-is
    assert_eq!(run.trades().count(), 0);
    assert_eq!(run.account.capital, dec!(10000));
}
