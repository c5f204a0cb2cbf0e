//! Backtesting engine.
//!
//! [`BacktestEngine`] replays an indicator feed bar by bar through the
//! sizing, execution and position components. [`PerformanceAnalyzer`]
//! turns the resulting journal and equity curve into statistics.

mod engine;
mod journal;
mod report;
mod runner;
mod statistics;

pub use engine::{BacktestConfig, BacktestEngine, BacktestRun, RunStatus};
pub use journal::{JournalEvent, NoTradeEvent, TradeJournal};
pub use report::BacktestReport;
pub use runner::{run_symbols, SymbolJob};
pub use statistics::{PerformanceAnalyzer, PerformanceStats};
