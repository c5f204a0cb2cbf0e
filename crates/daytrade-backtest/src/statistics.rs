//! Backtest statistics.

use std::collections::BTreeMap;

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::engine::BacktestRun;
use crate::journal::TradeJournal;
use daytrade_core::types::{EquityPoint, ExitReason, Timeframe};

/// Performance summary of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    /// Initial capital
    pub initial_capital: Decimal,
    /// Last equity point, or initial capital for an empty curve
    pub final_equity: Decimal,
    /// Total return percentage
    pub total_return_pct: Decimal,
    /// Largest peak-to-trough decline, percent of the peak
    pub max_drawdown_pct: Decimal,
    /// Largest peak-to-trough decline in currency
    pub max_drawdown: Decimal,
    /// Annualized Sharpe ratio (risk-free rate 0)
    pub sharpe_ratio: f64,
    /// Annualized Sortino ratio
    pub sortino_ratio: f64,
    /// Annualized return over max drawdown
    pub calmar_ratio: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    /// Win rate percentage
    pub win_rate_pct: Decimal,
    /// Average profit per winning trade
    pub avg_win: Decimal,
    /// Average loss per losing trade, as a positive amount
    pub avg_loss: Decimal,
    /// avg_win / avg_loss, zero without losses
    pub win_loss_ratio: Decimal,
    /// Gross profit / gross loss, None without losses
    pub profit_factor: Option<Decimal>,
    /// Net realized PnL
    pub net_pnl: Decimal,
    pub total_fees: Decimal,
    /// Percentage of processed bars with an open position
    pub exposure_pct: Decimal,
    pub trades_by_exit_reason: BTreeMap<ExitReason, usize>,
    pub no_trade_events: usize,
    pub equity_points: usize,
}

/// Read-only consumer of a finished journal and equity curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceAnalyzer {
    periods_per_year: f64,
}

impl Default for PerformanceAnalyzer {
    fn default() -> Self {
        Self::for_timeframe(Timeframe::default())
    }
}

impl PerformanceAnalyzer {
    /// `periods_per_year` is the number of equity points per year.
    pub fn new(periods_per_year: f64) -> Self {
        Self { periods_per_year }
    }

    pub fn for_timeframe(timeframe: Timeframe) -> Self {
        Self::new(timeframe.periods_per_year())
    }

    pub fn periods_per_year(&self) -> f64 {
        self.periods_per_year
    }

    /// Statistics for a run, including market exposure.
    pub fn analyze_run(&self, run: &BacktestRun) -> PerformanceStats {
        let mut stats = self.analyze(
            run.account.initial_capital,
            &run.account.equity_curve,
            &run.journal,
        );
        if run.bars_processed > 0 {
            stats.exposure_pct = Decimal::from(run.bars_in_market) * Decimal::ONE_HUNDRED
                / Decimal::from(run.bars_processed);
        }
        stats
    }

    /// Statistics from a journal and equity curve.
    pub fn analyze(
        &self,
        initial_capital: Decimal,
        equity_curve: &[EquityPoint],
        journal: &TradeJournal,
    ) -> PerformanceStats {
        let final_equity = equity_curve
            .last()
            .map_or(initial_capital, |p| p.equity);
        let total_return_pct = if initial_capital > Decimal::ZERO {
            (final_equity - initial_capital) / initial_capital * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        let (max_drawdown, max_drawdown_pct) = max_drawdown(initial_capital, equity_curve);
        let returns = period_returns(initial_capital, equity_curve);
        let sharpe_ratio = self.sharpe(&returns);
        let sortino_ratio = self.sortino(&returns);
        let calmar_ratio = self.calmar(
            to_f64(total_return_pct) / 100.0,
            returns.len(),
            to_f64(max_drawdown_pct) / 100.0,
        );

        let mut stats = PerformanceStats {
            initial_capital,
            final_equity,
            total_return_pct,
            max_drawdown_pct,
            max_drawdown,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            breakeven_trades: 0,
            win_rate_pct: Decimal::ZERO,
            avg_win: Decimal::ZERO,
            avg_loss: Decimal::ZERO,
            win_loss_ratio: Decimal::ZERO,
            profit_factor: None,
            net_pnl: Decimal::ZERO,
            total_fees: Decimal::ZERO,
            exposure_pct: Decimal::ZERO,
            trades_by_exit_reason: BTreeMap::new(),
            no_trade_events: journal.no_trades().count(),
            equity_points: equity_curve.len(),
        };

        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        for trade in journal.trades() {
            stats.total_trades += 1;
            stats.net_pnl += trade.pnl;
            stats.total_fees += trade.fees_paid;
            *stats
                .trades_by_exit_reason
                .entry(trade.exit_reason)
                .or_default() += 1;

            if trade.is_win() {
                stats.winning_trades += 1;
                gross_profit += trade.pnl;
            } else if trade.is_loss() {
                stats.losing_trades += 1;
                gross_loss += trade.pnl.abs();
            } else {
                stats.breakeven_trades += 1;
            }
        }

        if stats.total_trades > 0 {
            stats.win_rate_pct = Decimal::from(stats.winning_trades) * Decimal::ONE_HUNDRED
                / Decimal::from(stats.total_trades);
        }
        if stats.winning_trades > 0 {
            stats.avg_win = gross_profit / Decimal::from(stats.winning_trades);
        }
        if stats.losing_trades > 0 {
            stats.avg_loss = gross_loss / Decimal::from(stats.losing_trades);
        }
        if stats.avg_loss > Decimal::ZERO {
            stats.win_loss_ratio = stats.avg_win / stats.avg_loss;
        }
        if gross_loss > Decimal::ZERO {
            stats.profit_factor = Some(gross_profit / gross_loss);
        }

        stats
    }

    /// Mean over sample standard deviation, annualized. Zero when the
    /// ratio is undefined.
    fn sharpe(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }
        let mean = returns.mean();
        let std_dev = returns.std_dev();
        if !std_dev.is_finite() || std_dev <= f64::EPSILON {
            return 0.0;
        }
        mean / std_dev * self.periods_per_year.sqrt()
    }

    /// Like Sharpe, but only returns below zero count as risk.
    fn sortino(&self, returns: &[f64]) -> f64 {
        if returns.is_empty() {
            return 0.0;
        }
        let mean = returns.mean();
        let downside = returns
            .iter()
            .map(|r| r.min(0.0).powi(2))
            .sum::<f64>()
            / returns.len() as f64;
        let downside_dev = downside.sqrt();
        if downside_dev <= f64::EPSILON {
            return 0.0;
        }
        mean / downside_dev * self.periods_per_year.sqrt()
    }

    fn calmar(&self, total_return: f64, periods: usize, max_drawdown: f64) -> f64 {
        if periods == 0 || max_drawdown <= f64::EPSILON || total_return <= -1.0 {
            return 0.0;
        }
        let years = periods as f64 / self.periods_per_year;
        let annualized = (1.0 + total_return).powf(1.0 / years) - 1.0;
        if annualized.is_finite() {
            annualized / max_drawdown
        } else {
            0.0
        }
    }
}

/// Returns between consecutive equity points, the first measured from
/// initial capital.
fn period_returns(initial_capital: Decimal, equity_curve: &[EquityPoint]) -> Vec<f64> {
    let mut prev = initial_capital;
    let mut returns = Vec::with_capacity(equity_curve.len());
    for point in equity_curve {
        if prev > Decimal::ZERO {
            returns.push(to_f64((point.equity - prev) / prev));
        }
        prev = point.equity;
    }
    returns
}

/// (absolute, percent) peak-to-trough decline. The peak starts at initial
/// capital.
fn max_drawdown(initial_capital: Decimal, equity_curve: &[EquityPoint]) -> (Decimal, Decimal) {
    let mut peak = initial_capital;
    let mut worst = Decimal::ZERO;
    let mut worst_pct = Decimal::ZERO;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }
        let drawdown = peak - point.equity;
        if drawdown > worst {
            worst = drawdown;
        }
        if peak > Decimal::ZERO {
            let pct = drawdown / peak * Decimal::ONE_HUNDRED;
            if pct > worst_pct {
                worst_pct = pct;
            }
        }
    }
    (worst, worst_pct)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
