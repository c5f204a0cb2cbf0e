//! Error types for the trading engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PositionStatus;

/// Top-level error.
#[derive(Error, Debug)]
pub enum TradingError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Task failed: {0}")]
    Task(String),
}

/// Failures raised by the simulation core.
///
/// Every variant is recoverable at the orchestrator level except
/// `DataGap`, which halts the run for the affected symbol. Rejections are
/// journaled verbatim, hence `Clone` and serde support.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineError {
    #[error("Invalid risk: {reason}")]
    InvalidRisk { reason: String },

    #[error("Insufficient capital: required {required}, available {available}")]
    InsufficientCapital {
        required: Decimal,
        available: Decimal,
    },

    #[error("Insufficient liquidity: requested {requested}, max allowed {max_allowed}")]
    InsufficientLiquidity {
        requested: Decimal,
        max_allowed: Decimal,
    },

    #[error("A position is already open")]
    PositionAlreadyOpen,

    #[error("Data gap at {timestamp}: {reason}")]
    DataGap { timestamp: i64, reason: String },

    #[error("Invalid position transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: PositionStatus,
        to: PositionStatus,
    },
}

impl EngineError {
    /// Short machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidRisk { .. } => "invalid_risk",
            EngineError::InsufficientCapital { .. } => "insufficient_capital",
            EngineError::InsufficientLiquidity { .. } => "insufficient_liquidity",
            EngineError::PositionAlreadyOpen => "position_already_open",
            EngineError::DataGap { .. } => "data_gap",
            EngineError::InvalidTransition { .. } => "invalid_transition",
        }
    }

    /// Whether the run must stop for this symbol.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::DataGap { .. } | EngineError::InvalidTransition { .. }
        )
    }

    pub fn invalid_risk(reason: impl Into<String>) -> Self {
        EngineError::InvalidRisk {
            reason: reason.into(),
        }
    }

    pub fn data_gap(timestamp: i64, reason: impl Into<String>) -> Self {
        EngineError::DataGap {
            timestamp,
            reason: reason.into(),
        }
    }
}

/// Strategy-specific errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),
}

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within {range}, got {value}")]
    OutOfRange {
        field: &'static str,
        range: &'static str,
        value: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Data loading errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available at {0}")]
    NoDataAvailable(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Indicator calculation errors.
#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for trading operations.
pub type TradingResult<T> = Result<T, TradingError>;
