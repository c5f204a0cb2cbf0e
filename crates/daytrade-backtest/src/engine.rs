//! Backtesting engine.

use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::journal::TradeJournal;
use daytrade_core::error::{ConfigError, EngineError};
use daytrade_core::traits::SignalGenerator;
use daytrade_core::types::{
    Account, Bar, ExitReason, FeedItem, PreciseBar, Signal, Timeframe, Trade,
};
use daytrade_execution::{ExecutionConfig, ExecutionSimulator, PositionManager, SameBarPolicy};
use daytrade_risk::{RiskConfig, RiskSizer, TrailingStopRule};

/// Backtest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Initial capital
    pub initial_capital: Decimal,
    /// Position sizing
    pub risk: RiskConfig,
    /// Fill model
    pub execution: ExecutionConfig,
    pub trailing: TrailingStopRule,
    pub same_bar_policy: SameBarPolicy,
    /// Close a position still open after the last bar
    pub close_at_end: bool,
    /// Largest allowed gap between consecutive bars
    pub max_bar_gap_ms: Option<i64>,
    /// Return periods per year, used to annualize ratios
    pub periods_per_year: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(10000),
            risk: RiskConfig::default(),
            execution: ExecutionConfig::default(),
            trailing: TrailingStopRule::default(),
            same_bar_policy: SameBarPolicy::default(),
            close_at_end: true,
            max_bar_gap_ms: None,
            periods_per_year: Timeframe::default().periods_per_year(),
        }
    }
}

impl BacktestConfig {
    pub fn with_capital(mut self, initial_capital: Decimal) -> Self {
        self.initial_capital = initial_capital;
        self
    }

    pub fn with_risk(mut self, risk: RiskConfig) -> Self {
        self.risk = risk;
        self
    }

    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_trailing(mut self, trailing: TrailingStopRule) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn with_same_bar_policy(mut self, policy: SameBarPolicy) -> Self {
        self.same_bar_policy = policy;
        self
    }

    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.periods_per_year = timeframe.periods_per_year();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "initial_capital",
                range: "> 0",
                value: self.initial_capital.to_string(),
            });
        }
        self.risk.validate()?;
        self.execution.validate()?;
        match self.trailing {
            TrailingStopRule::Fraction { distance } if distance < Decimal::ZERO => {
                return Err(ConfigError::OutOfRange {
                    field: "trailing_distance",
                    range: ">= 0",
                    value: distance.to_string(),
                });
            }
            TrailingStopRule::Atr { multiplier } if multiplier < Decimal::ZERO => {
                return Err(ConfigError::OutOfRange {
                    field: "trailing_atr_multiplier",
                    range: ">= 0",
                    value: multiplier.to_string(),
                });
            }
            _ => {}
        }
        if let Some(gap) = self.max_bar_gap_ms {
            if gap <= 0 {
                return Err(ConfigError::OutOfRange {
                    field: "max_bar_gap_ms",
                    range: "> 0",
                    value: gap.to_string(),
                });
            }
        }
        if !(self.periods_per_year.is_finite() && self.periods_per_year > 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "periods_per_year",
                range: "> 0",
                value: self.periods_per_year.to_string(),
            });
        }
        Ok(())
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    /// Every bar was processed
    Completed,
    /// Stopped on a fatal engine error; later bars were not processed
    Halted { error: EngineError },
    /// Stopped by the cancel flag
    Cancelled,
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

/// Everything a single-symbol run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRun {
    pub strategy: String,
    pub status: RunStatus,
    /// True when the run stopped before the end of the feed
    pub truncated: bool,
    pub journal: TradeJournal,
    pub account: Account,
    pub bars_processed: usize,
    /// Bars on which a position was already open at the bar's start
    pub bars_in_market: usize,
}

impl BacktestRun {
    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.journal.trades()
    }

    pub fn final_equity(&self) -> Decimal {
        self.account.equity()
    }
}

/// Bar-by-bar replay of one symbol's feed.
///
/// Every run starts from a clean account and position, so replaying the
/// same feed with the same configuration yields the same journal.
#[derive(Debug, Clone, Default)]
pub struct BacktestEngine {
    config: BacktestConfig,
}

/// Per-run mutable state. Owned by one run, never shared.
struct RunState {
    sizer: RiskSizer,
    exec: ExecutionSimulator,
    manager: PositionManager,
    account: Account,
    journal: TradeJournal,
}

impl BacktestEngine {
    /// Create a new backtest engine.
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run over the whole feed.
    pub fn run(&self, strategy: &mut dyn SignalGenerator, feed: &[FeedItem]) -> BacktestRun {
        let never = AtomicBool::new(false);
        self.run_until(strategy, feed, &never)
    }

    /// Run until the feed ends, a fatal error occurs, or `cancel` is set.
    pub fn run_until(
        &self,
        strategy: &mut dyn SignalGenerator,
        feed: &[FeedItem],
        cancel: &AtomicBool,
    ) -> BacktestRun {
        strategy.reset();
        let mut state = RunState {
            sizer: RiskSizer::new(self.config.risk.clone()),
            exec: ExecutionSimulator::new(self.config.execution.clone()),
            manager: PositionManager::new(self.config.trailing, self.config.same_bar_policy),
            account: Account::new(self.config.initial_capital),
            journal: TradeJournal::new(),
        };

        info!(
            strategy = strategy.name(),
            bars = feed.len(),
            capital = %self.config.initial_capital,
            trailing = self.config.trailing.is_enabled(),
            "Starting backtest"
        );

        let mut status = RunStatus::Completed;
        let mut prev_timestamp: Option<i64> = None;
        let mut last_bar: Option<PreciseBar> = None;
        let mut bars_processed = 0;
        let mut bars_in_market = 0;

        for item in feed {
            if cancel.load(Ordering::Relaxed) {
                info!(at = item.bar.timestamp, "Backtest cancelled");
                status = RunStatus::Cancelled;
                break;
            }

            let bar = match self.check_bar(&item.bar, prev_timestamp) {
                Ok(bar) => bar,
                Err(error) => {
                    warn!(%error, "Halting backtest");
                    status = RunStatus::Halted { error };
                    break;
                }
            };
            prev_timestamp = Some(bar.timestamp);

            let atr = item.indicators.atr().and_then(|v| Decimal::try_from(v).ok());
            let signal = strategy.evaluate(&item.bar, &item.indicators);

            if let Err(error) = self.step(&mut state, &bar, atr, signal.as_ref(), &mut bars_in_market)
            {
                warn!(%error, "Halting backtest");
                status = RunStatus::Halted { error };
                break;
            }
            bars_processed += 1;
            last_bar = Some(bar);
        }

        if status.is_completed() && self.config.close_at_end {
            if let Some(bar) = last_bar {
                if let Err(error) = Self::close_at_end(&mut state, &bar) {
                    warn!(%error, "End-of-data close failed");
                    status = RunStatus::Halted { error };
                }
            }
        }

        let truncated = !status.is_completed();
        info!(
            strategy = strategy.name(),
            bars = bars_processed,
            trades = state.journal.trade_count(),
            rejected = state.journal.no_trades().count(),
            capital = %state.account.capital,
            truncated,
            "Backtest finished"
        );

        BacktestRun {
            strategy: strategy.name().to_string(),
            status,
            truncated,
            journal: state.journal,
            account: state.account,
            bars_processed,
            bars_in_market,
        }
    }

    /// Reject bars that would corrupt stop/target evaluation.
    fn check_bar(&self, bar: &Bar, prev_timestamp: Option<i64>) -> Result<PreciseBar, EngineError> {
        if let Some(prev) = prev_timestamp {
            if bar.timestamp <= prev {
                return Err(EngineError::data_gap(
                    bar.timestamp,
                    format!("timestamp not after previous bar at {prev}"),
                ));
            }
            if let Some(max_gap) = self.config.max_bar_gap_ms {
                let gap = bar.timestamp - prev;
                if gap > max_gap {
                    return Err(EngineError::data_gap(
                        bar.timestamp,
                        format!("{gap}ms since previous bar exceeds {max_gap}ms"),
                    ));
                }
            }
        }
        if !bar.is_finite() {
            return Err(EngineError::data_gap(bar.timestamp, "missing or non-finite value"));
        }
        if bar.high < bar.low {
            return Err(EngineError::data_gap(
                bar.timestamp,
                format!("high {} below low {}", bar.high, bar.low),
            ));
        }
        PreciseBar::try_from(bar)
    }

    /// One bar: either step the open position or consider an entry.
    fn step(
        &self,
        state: &mut RunState,
        bar: &PreciseBar,
        atr: Option<Decimal>,
        signal: Option<&Signal>,
        bars_in_market: &mut usize,
    ) -> Result<(), EngineError> {
        if state.manager.has_open_position() {
            *bars_in_market += 1;
            if let Some(trade) = state.manager.update(&mut state.exec, bar, atr, signal)? {
                state.account.apply_pnl(trade.pnl);
                state.journal.record_trade(trade);
            }
        } else if let Some(signal) = signal.filter(|s| s.direction.entry().is_some()) {
            Self::try_enter(state, bar, atr, signal)?;
        }

        let equity = state.account.capital + state.manager.unrealized_pnl(bar.close);
        state.account.record_equity(bar.timestamp, equity)
    }

    /// Size and fill an entry. Refusals go to the journal; only a fatal
    /// error stops the run.
    fn try_enter(
        state: &mut RunState,
        bar: &PreciseBar,
        atr: Option<Decimal>,
        signal: &Signal,
    ) -> Result<(), EngineError> {
        let result = atr
            .ok_or_else(|| EngineError::invalid_risk("ATR not available"))
            .and_then(|atr| state.sizer.size_position(signal, &state.account, atr, bar.close))
            .and_then(|decision| {
                state
                    .manager
                    .open(&mut state.exec, &decision, bar.timestamp, bar.close, bar.volume)
                    .map(|_| ())
            });

        if let Err(error) = result {
            if error.is_fatal() {
                return Err(error);
            }
            match error {
                EngineError::InvalidRisk { .. } => {
                    debug!(at = bar.timestamp, direction = %signal.direction, %error, "Entry skipped")
                }
                _ => warn!(at = bar.timestamp, direction = %signal.direction, %error, "Entry rejected"),
            }
            state
                .journal
                .record_no_trade(bar.timestamp, signal.direction, error);
        }
        Ok(())
    }

    fn close_at_end(state: &mut RunState, bar: &PreciseBar) -> Result<(), EngineError> {
        let closed = state.manager.close_at(
            &mut state.exec,
            bar.close,
            bar.timestamp,
            ExitReason::EndOfData,
        )?;
        if let Some(trade) = closed {
            state.account.apply_pnl(trade.pnl);
            state.journal.record_trade(trade);
            // Realized value follows the last mark at the same timestamp
            state.account.record_equity(bar.timestamp, state.account.capital)?;
        }
        Ok(())
    }
}
