//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "daytrade")]
#[command(author, version, about = "Deterministic day-trading simulation engine")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", env = "DAYTRADE_CONFIG")]
    pub config: PathBuf,

    /// Log level, overrides the configuration file
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run backtesting simulation
    Backtest(BacktestArgs),
    /// List available strategies
    Strategies,
    /// Validate configuration
    ValidateConfig,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Strategy to backtest; defaults to the configured one
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Symbols to trade (comma-separated); defaults to the configured list
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// CSV file or directory of <SYMBOL>.csv files
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Bar timeframe, used to annualize ratios
    #[arg(short, long)]
    pub timeframe: Option<String>,

    /// Initial capital per symbol
    #[arg(long)]
    pub capital: Option<f64>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Save reports as JSON
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Write closed trades as CSV
    #[arg(long)]
    pub trades_csv: Option<PathBuf>,

    /// Write the equity curve as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,
}
