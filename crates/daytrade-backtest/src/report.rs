//! Backtest report generation.

use serde::{Deserialize, Serialize};

use crate::engine::{BacktestRun, RunStatus};
use crate::journal::NoTradeEvent;
use crate::statistics::{PerformanceAnalyzer, PerformanceStats};
use daytrade_core::error::TradingError;
use daytrade_core::types::{EquityPoint, Trade};

/// Complete backtest report for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub strategy: String,
    pub status: RunStatus,
    pub truncated: bool,
    pub stats: PerformanceStats,
    pub trades: Vec<Trade>,
    pub no_trades: Vec<NoTradeEvent>,
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestReport {
    pub fn from_run(symbol: impl Into<String>, run: &BacktestRun, analyzer: &PerformanceAnalyzer) -> Self {
        Self {
            symbol: symbol.into(),
            strategy: run.strategy.clone(),
            status: run.status.clone(),
            truncated: run.truncated,
            stats: analyzer.analyze_run(run),
            trades: run.trades().cloned().collect(),
            no_trades: run.journal.no_trades().cloned().collect(),
            equity_curve: run.account.equity_curve.clone(),
        }
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let mut s = String::new();
        let stats = &self.stats;

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str(&format!("  BACKTEST REPORT  {} / {}\n", self.symbol, self.strategy));
        s.push_str("═══════════════════════════════════════════════════════════\n\n");

        match &self.status {
            RunStatus::Completed => {}
            RunStatus::Halted { error } => {
                s.push_str(&format!("  !! Halted: {error}\n\n"));
            }
            RunStatus::Cancelled => s.push_str("  !! Cancelled before end of data\n\n"),
        }

        s.push_str("PERFORMANCE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Initial Capital:     ${:.2}\n", stats.initial_capital));
        s.push_str(&format!("  Final Equity:        ${:.2}\n", stats.final_equity));
        s.push_str(&format!("  Total Return:        {:.2}%\n", stats.total_return_pct));
        s.push_str(&format!(
            "  Max Drawdown:        {:.2}% (${:.2})\n",
            stats.max_drawdown_pct, stats.max_drawdown
        ));
        s.push_str(&format!("  Exposure:            {:.2}%\n", stats.exposure_pct));
        s.push('\n');

        s.push_str("RISK METRICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Sharpe Ratio:        {:.2}\n", stats.sharpe_ratio));
        s.push_str(&format!("  Sortino Ratio:       {:.2}\n", stats.sortino_ratio));
        s.push_str(&format!("  Calmar Ratio:        {:.2}\n", stats.calmar_ratio));
        match stats.profit_factor {
            Some(pf) => s.push_str(&format!("  Profit Factor:       {pf:.2}\n")),
            None => s.push_str("  Profit Factor:       n/a\n"),
        }
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Total Trades:        {}\n", stats.total_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", stats.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", stats.losing_trades));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", stats.win_rate_pct));
        s.push_str(&format!("  Avg Win:             ${:.2}\n", stats.avg_win));
        s.push_str(&format!("  Avg Loss:            ${:.2}\n", stats.avg_loss));
        s.push_str(&format!("  Win/Loss Ratio:      {:.2}\n", stats.win_loss_ratio));
        s.push_str(&format!("  Net PnL:             ${:.2}\n", stats.net_pnl));
        s.push_str(&format!("  Fees Paid:           ${:.2}\n", stats.total_fees));
        for (reason, count) in &stats.trades_by_exit_reason {
            s.push_str(&format!("    {:<18} {}\n", reason.to_string(), count));
        }
        s.push('\n');

        s.push_str("EXECUTION\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Equity Points:       {}\n", stats.equity_points));
        s.push_str(&format!("  Rejected Entries:    {}\n", stats.no_trade_events));
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Equity curve as CSV (`timestamp,equity`).
    pub fn equity_to_csv(&self) -> Result<String, TradingError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for point in &self.equity_curve {
            writer.serialize(point).map_err(csv_error)?;
        }
        into_string(writer)
    }

    /// Closed trades as CSV, one row per trade.
    pub fn trades_to_csv(&self) -> Result<String, TradingError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for trade in &self.trades {
            writer.serialize(trade).map_err(csv_error)?;
        }
        into_string(writer)
    }
}

fn csv_error(err: csv::Error) -> TradingError {
    TradingError::Serialization(err.to_string())
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String, TradingError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| TradingError::Serialization(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| TradingError::Serialization(e.to_string()))
}
