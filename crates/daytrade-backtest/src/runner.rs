//! Independent per-symbol runs on the blocking thread pool.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info};

use crate::engine::{BacktestConfig, BacktestEngine, BacktestRun};
use daytrade_core::error::TradingError;
use daytrade_core::types::FeedItem;
use daytrade_strategies::Strategy;

/// One symbol's feed and its own strategy instance.
#[derive(Debug, Clone)]
pub struct SymbolJob {
    pub symbol: String,
    pub feed: Vec<FeedItem>,
    pub strategy: Strategy,
}

impl SymbolJob {
    pub fn new(symbol: impl Into<String>, feed: Vec<FeedItem>, strategy: Strategy) -> Self {
        Self {
            symbol: symbol.into(),
            feed,
            strategy,
        }
    }
}

/// Run every job on its own blocking task and collect results by symbol.
///
/// Symbols share nothing but the configuration and the cancel flag; each
/// run owns its account and position.
pub async fn run_symbols(
    config: BacktestConfig,
    jobs: Vec<SymbolJob>,
    cancel: Arc<AtomicBool>,
) -> BTreeMap<String, Result<BacktestRun, TradingError>> {
    info!(symbols = jobs.len(), "Running backtests");

    let engine = Arc::new(BacktestEngine::new(config));
    let handles = jobs.into_iter().map(|job| {
        let engine = Arc::clone(&engine);
        let cancel = Arc::clone(&cancel);
        let symbol = job.symbol.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let SymbolJob {
                feed, mut strategy, ..
            } = job;
            engine.run_until(&mut strategy, &feed, &cancel)
        });
        async move { (symbol, handle.await) }
    });

    join_all(handles)
        .await
        .into_iter()
        .map(|(symbol, joined)| {
            let result = joined.map_err(|e| {
                error!(%symbol, error = %e, "Backtest task failed");
                TradingError::Task(format!("{symbol}: {e}"))
            });
            (symbol, result)
        })
        .collect()
}
