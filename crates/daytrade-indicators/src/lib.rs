//! Streaming technical indicators.
//!
//! Every indicator consumes one value (or bar) at a time, so the value
//! attached to bar `t` is computed from bars `0..=t` only:
//! - Moving averages (SMA, EMA)
//! - Momentum (RSI, MACD)
//! - Volatility (ATR, Bollinger Bands, Standard Deviation)
//!
//! [`IndicatorPipeline`] bundles the set the strategies read and turns a
//! bar series into the feed the backtester consumes.

pub mod momentum;
pub mod moving_average;
pub mod pipeline;
pub mod volatility;

pub use momentum::{Macd, MacdOutput, Rsi};
pub use moving_average::{Ema, Sma};
pub use pipeline::{build_feed, IndicatorParams, IndicatorPipeline};
pub use volatility::{Atr, BollingerBands, BollingerOutput, StdDev};
