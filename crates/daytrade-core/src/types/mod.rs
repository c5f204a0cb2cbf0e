//! Core data types for the trading engine.

mod account;
mod indicators;
mod ohlcv;
mod position;
mod side;
mod signal;
mod timeframe;
mod trade;

pub use account::{Account, EquityPoint};
pub use indicators::{names, FeedItem, IndicatorSnapshot};
pub use ohlcv::{Bar, PreciseBar};
pub use position::{Position, PositionStatus};
pub use side::{Direction, Side};
pub use signal::{Signal, SignalDirection};
pub use timeframe::Timeframe;
pub use trade::{ExitReason, Fill, Trade};
