//! Configuration structures.

use std::path::PathBuf;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use daytrade_backtest::BacktestConfig;
use daytrade_core::error::ConfigError;
use daytrade_core::types::Timeframe;
use daytrade_execution::{ExecutionConfig, SameBarPolicy};
use daytrade_indicators::IndicatorParams;
use daytrade_risk::{RiskConfig, TrailingStopRule};
use daytrade_strategies::StrategySpec;

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub indicators: IndicatorParams,
    #[serde(default)]
    pub strategy: StrategySpec,
    #[serde(default)]
    pub backtest: BacktestSettings,
}

impl AppConfig {
    /// Check every section. The first problem found is returned.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.indicators
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.strategy
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    /// Engine settings with annualization taken from the backtest timeframe.
    pub fn backtest_config(&self) -> BacktestConfig {
        self.engine.to_backtest_config(self.backtest.timeframe)
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// General app settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "daytrade".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    pub format: LogFormat,
    /// Daily-rotated log file, written as JSON
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// The engine's recognized options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fraction of capital risked per trade
    pub risk_per_trade: Decimal,
    /// Stop distance in ATRs
    pub atr_multiplier_stop: Decimal,
    /// Target distance as a multiple of the stop distance
    pub reward_risk_ratio: Decimal,
    /// Fractional trailing distance, 0 disables
    pub trailing_distance: Decimal,
    pub fee_rate: Decimal,
    pub slippage_rate: Decimal,
    /// Largest order as a fraction of bar volume
    pub max_liquidity_fraction: Decimal,
    pub initial_capital: Decimal,
    pub max_leverage: Decimal,
    pub flat_fee: Option<Decimal>,
    pub min_stop_fraction: Decimal,
    /// Trail by ATR multiples instead of a fraction of price
    pub trailing_atr_multiplier: Option<Decimal>,
    pub size_decimals: u32,
    pub same_bar_policy: SameBarPolicy,
    pub close_at_end: bool,
    pub max_bar_gap_ms: Option<i64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let risk = RiskConfig::default();
        let execution = ExecutionConfig::default();
        Self {
            risk_per_trade: risk.risk_per_trade,
            atr_multiplier_stop: risk.atr_multiplier_stop,
            reward_risk_ratio: risk.reward_risk_ratio,
            trailing_distance: Decimal::ZERO,
            fee_rate: execution.fee_rate,
            slippage_rate: execution.slippage_rate,
            max_liquidity_fraction: execution.max_liquidity_fraction,
            initial_capital: dec!(10000),
            max_leverage: risk.max_leverage,
            flat_fee: None,
            min_stop_fraction: risk.min_stop_fraction,
            trailing_atr_multiplier: None,
            size_decimals: risk.size_decimals,
            same_bar_policy: SameBarPolicy::default(),
            close_at_end: true,
            max_bar_gap_ms: None,
        }
    }
}

impl EngineConfig {
    pub fn risk_config(&self) -> RiskConfig {
        RiskConfig {
            risk_per_trade: self.risk_per_trade,
            atr_multiplier_stop: self.atr_multiplier_stop,
            reward_risk_ratio: self.reward_risk_ratio,
            min_stop_fraction: self.min_stop_fraction,
            max_leverage: self.max_leverage,
            size_decimals: self.size_decimals,
        }
    }

    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            fee_rate: self.fee_rate,
            flat_fee: self.flat_fee.unwrap_or(Decimal::ZERO),
            slippage_rate: self.slippage_rate,
            max_liquidity_fraction: self.max_liquidity_fraction,
        }
    }

    pub fn trailing_rule(&self) -> TrailingStopRule {
        TrailingStopRule::from_options(self.trailing_distance, self.trailing_atr_multiplier)
    }

    pub fn to_backtest_config(&self, timeframe: Timeframe) -> BacktestConfig {
        BacktestConfig {
            initial_capital: self.initial_capital,
            risk: self.risk_config(),
            execution: self.execution_config(),
            trailing: self.trailing_rule(),
            same_bar_policy: self.same_bar_policy,
            close_at_end: self.close_at_end,
            max_bar_gap_ms: self.max_bar_gap_ms,
            periods_per_year: timeframe.periods_per_year(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trailing_distance < Decimal::ZERO || self.trailing_distance >= Decimal::ONE {
            return Err(ConfigError::OutOfRange {
                field: "trailing_distance",
                range: "[0, 1)",
                value: self.trailing_distance.to_string(),
            });
        }
        if let Some(multiplier) = self.trailing_atr_multiplier {
            if multiplier < Decimal::ZERO {
                return Err(ConfigError::OutOfRange {
                    field: "trailing_atr_multiplier",
                    range: ">= 0",
                    value: multiplier.to_string(),
                });
            }
        }
        self.to_backtest_config(Timeframe::default()).validate()
    }
}

/// Backtest settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    /// Bar timeframe, drives annualization of ratios
    pub timeframe: Timeframe,
    /// CSV file or directory of `<SYMBOL>.csv` files
    pub data_dir: PathBuf,
    /// Symbols run when none are given on the command line
    pub symbols: Vec<String>,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::default(),
            data_dir: PathBuf::from("data"),
            symbols: Vec::new(),
        }
    }
}
