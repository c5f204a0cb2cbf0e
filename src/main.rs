//! Day-trading simulation CLI.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use daytrade_config::{load_config, LogFormat};
use daytrade_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = load_config(&cli.config);

    // Logging comes from the config file when it loads; flags win
    let mut logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    if let Some(level) = cli.log_level {
        logging.level = level.as_str().to_string();
    }
    if cli.json_logs {
        logging.format = LogFormat::Json;
    }
    let _guard = setup_logging(&logging).context("Failed to install logging")?;

    match cli.command {
        Commands::Backtest(args) => {
            let config = loaded
                .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
            cli::commands::backtest::run(args, config).await
        }
        Commands::Strategies => cli::commands::strategies::run(),
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config, loaded),
    }
}
