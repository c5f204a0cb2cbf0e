//! Price bars.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// One OHLCV bar as produced by the data collaborator.
///
/// Stored as f64 for indicator math; the engine converts to
/// [`PreciseBar`] before touching money.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Unix milliseconds, strictly increasing within a feed
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Wilder's true range against the previous close.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        let span = self.high - self.low;
        match prev_close {
            Some(pc) => span.max((self.high - pc).abs()).max((self.low - pc).abs()),
            None => span,
        }
    }

    /// All price and volume fields are finite numbers.
    pub fn is_finite(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Decimal copy of a [`Bar`] used for stop, target and fill arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreciseBar {
    pub timestamp: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl TryFrom<&Bar> for PreciseBar {
    type Error = EngineError;

    /// Missing or non-numeric values surface as a `DataGap`, never as zero.
    fn try_from(bar: &Bar) -> Result<Self, Self::Error> {
        let convert = |field: &str, value: f64| {
            Decimal::try_from(value).map_err(|_| {
                EngineError::data_gap(bar.timestamp, format!("{field} is not a number: {value}"))
            })
        };

        Ok(Self {
            timestamp: bar.timestamp,
            open: convert("open", bar.open)?,
            high: convert("high", bar.high)?,
            low: convert("low", bar.low)?,
            close: convert("close", bar.close)?,
            volume: convert("volume", bar.volume)?,
        })
    }
}
