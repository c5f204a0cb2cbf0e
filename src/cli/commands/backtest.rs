//! Backtest command implementation.

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

use daytrade_backtest::{run_symbols, BacktestReport, PerformanceAnalyzer, RunStatus, SymbolJob};
use daytrade_config::AppConfig;
use daytrade_core::types::Timeframe;
use daytrade_core::SignalGenerator;
use daytrade_indicators::build_feed;
use daytrade_strategies::{Strategy, StrategyRegistry};

use crate::cli::{BacktestArgs, OutputFormat};

pub async fn run(args: BacktestArgs, config: AppConfig) -> Result<()> {
    let strategy = build_strategy(args.strategy.as_deref(), &config)?;

    let timeframe = match &args.timeframe {
        Some(tf) => Timeframe::from_str(tf).map_err(anyhow::Error::msg)?,
        None => config.backtest.timeframe,
    };
    let mut backtest_config = config.engine.to_backtest_config(timeframe);
    if let Some(capital) = args.capital {
        backtest_config.initial_capital =
            Decimal::try_from(capital).context("Capital is not a valid amount")?;
    }
    backtest_config
        .validate()
        .context("Invalid backtest configuration")?;

    let symbols = if args.symbols.is_empty() {
        config.backtest.symbols.clone()
    } else {
        args.symbols.clone()
    };
    if symbols.is_empty() {
        bail!("No symbols given. Use --symbols AAPL,MSFT or set backtest.symbols");
    }

    let data = args.data.clone().unwrap_or_else(|| config.backtest.data_dir.clone());
    if !data.exists() {
        bail!(
            "Data path '{}' does not exist. Provide a CSV file or directory containing CSV files (e.g. --data ./data)",
            data.display()
        );
    }

    info!(
        strategy = %strategy_name(&strategy),
        symbols = symbols.len(),
        timeframe = %timeframe,
        "Starting backtest"
    );

    // Everything is loaded before any run starts
    let mut jobs = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        let bars = daytrade_data::load_symbol(&data, symbol)
            .with_context(|| format!("Failed to load data for {symbol}"))?;
        let feed = build_feed(&bars, &config.indicators).context("Invalid indicator parameters")?;
        info!(%symbol, bars = feed.len(), "Loaded feed");
        jobs.push(SymbolJob::new(symbol.clone(), feed, strategy.clone()));
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let ctrl_c = {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping backtests");
                cancel.store(true, Ordering::Relaxed);
            }
        })
    };

    let results = run_symbols(backtest_config.clone(), jobs, cancel).await;
    ctrl_c.abort();

    let analyzer = PerformanceAnalyzer::new(backtest_config.periods_per_year);
    let mut reports = BTreeMap::new();
    for (symbol, result) in results {
        let run = result.with_context(|| format!("Backtest for {symbol} did not finish"))?;
        if let RunStatus::Halted { error } = &run.status {
            warn!(%symbol, %error, "Run halted early");
        }
        reports.insert(symbol.clone(), BacktestReport::from_run(symbol, &run, &analyzer));
    }

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => {
            for report in reports.values() {
                println!("{}", report.summary());
            }
        }
    }

    let multi = reports.len() > 1;
    if let Some(save_path) = &args.save {
        std::fs::write(save_path, serde_json::to_string_pretty(&reports)?)
            .with_context(|| format!("Failed to write {}", save_path.display()))?;
        info!("Results saved to {:?}", save_path);
    }
    for (symbol, report) in &reports {
        if let Some(path) = &args.trades_csv {
            let path = per_symbol(path, symbol, multi);
            std::fs::write(&path, report.trades_to_csv()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        if let Some(path) = &args.equity_csv {
            let path = per_symbol(path, symbol, multi);
            std::fs::write(&path, report.equity_to_csv()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }

    Ok(())
}

/// The configured strategy, or the named one with its defaults.
fn build_strategy(kind: Option<&str>, config: &AppConfig) -> Result<Strategy> {
    let spec = match kind {
        Some(kind) if kind != config.strategy.kind() => {
            let registry = StrategyRegistry::new();
            return registry.create_default(kind).with_context(|| {
                format!(
                    "Failed to create strategy '{kind}'. Available: {}",
                    registry
                        .names()
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            });
        }
        _ => &config.strategy,
    };
    spec.build().context("Failed to create strategy")
}

fn strategy_name(strategy: &Strategy) -> String {
    strategy.name().to_string()
}

/// `trades.csv` becomes `trades_AAPL.csv` when several symbols share it.
fn per_symbol(path: &Path, symbol: &str, multi: bool) -> PathBuf {
    if !multi {
        return path.to_path_buf();
    }
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{stem}_{symbol}.{ext}"),
        None => format!("{stem}_{symbol}"),
    };
    path.with_file_name(name)
}
