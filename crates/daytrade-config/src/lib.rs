//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, AppSettings, BacktestSettings, EngineConfig, LogFormat, LoggingConfig,
};

use config::{Config, Environment, File};
use std::path::Path;
use thiserror::Error;

/// Environment variable prefix, e.g. `DAYTRADE__ENGINE__FEE_RATE`.
pub const ENV_PREFIX: &str = "DAYTRADE";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Source(#[from] config::ConfigError),

    #[error(transparent)]
    Invalid(#[from] daytrade_core::error::ConfigError),
}

/// Load configuration from file and environment, then validate it.
pub fn load_config(path: &Path) -> Result<AppConfig, LoadError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let app: AppConfig = config.try_deserialize()?;
    app.validate()?;
    Ok(app)
}
