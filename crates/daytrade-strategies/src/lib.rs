//! Strategy implementations.
//!
//! A closed set of signal generators, selected by configuration:
//! - Confluence (EMA/SMA trend, RSI extremes, Bollinger breaks)
//! - Moving Average Crossover
//! - RSI Reversion
//! - MACD Momentum

mod confluence;
mod ma_crossover;
mod macd_momentum;
mod registry;
mod rsi_reversion;
mod strategy;

pub use confluence::{ConfluenceConfig, ConfluenceStrategy};
pub use ma_crossover::{MaCrossoverConfig, MaCrossoverStrategy};
pub use macd_momentum::{MacdMomentumConfig, MacdMomentumStrategy};
pub use registry::{StrategyInfo, StrategyRegistry};
pub use rsi_reversion::{RsiReversionConfig, RsiReversionStrategy};
pub use strategy::{Strategy, StrategySpec};
