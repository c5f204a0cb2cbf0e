//! Core types and traits for the day-trading engine.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, PreciseBar, IndicatorSnapshot, FeedItem)
//! - Signals, positions, fills, trades and the account ledger
//! - The engine error taxonomy
//! - Core traits for signal generation and streaming indicators

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    ConfigError, DataError, EngineError, IndicatorError, StrategyError, TradingError,
    TradingResult,
};
pub use traits::*;
pub use types::*;
