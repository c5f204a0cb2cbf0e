//! Validate configuration command.

use anyhow::Result;
use std::path::Path;

use daytrade_config::{AppConfig, LoadError};

pub fn run(config_path: &Path, loaded: Result<AppConfig, LoadError>) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    match loaded {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Log level: {}", config.logging.level);
            println!("Strategy: {}", config.strategy.kind());
            println!("Timeframe: {}", config.backtest.timeframe);
            println!("Risk per trade: {}", config.engine.risk_per_trade);
            println!("Same-bar policy: {:?}", config.engine.same_bar_policy);
            println!();
            println!("Effective configuration:");
            println!("{}", config.to_toml()?);
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
