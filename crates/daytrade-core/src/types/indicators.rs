//! Per-bar indicator values handed to the engine.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Bar;

/// Canonical indicator names used in snapshots.
pub mod names {
    pub const SMA: &str = "sma";
    pub const EMA: &str = "ema";
    pub const RSI: &str = "rsi";
    pub const ATR: &str = "atr";
    pub const MACD: &str = "macd";
    pub const MACD_SIGNAL: &str = "macd_signal";
    pub const MACD_HISTOGRAM: &str = "macd_histogram";
    pub const BB_UPPER: &str = "bb_upper";
    pub const BB_MIDDLE: &str = "bb_middle";
    pub const BB_LOWER: &str = "bb_lower";
}

/// Indicator values computed for a single bar.
///
/// Indicators still warming up are simply absent. Ordered storage keeps
/// serialization stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    values: BTreeMap<String, f64>,
}

impl IndicatorSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value. Non-finite values are dropped.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        if value.is_finite() {
            self.values.insert(name.into(), value);
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    /// Record a value if present.
    pub fn insert_opt(&mut self, name: &str, value: Option<f64>) {
        if let Some(v) = value {
            self.insert(name, v);
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    #[inline]
    pub fn atr(&self) -> Option<f64> {
        self.get(names::ATR)
    }

    #[inline]
    pub fn rsi(&self) -> Option<f64> {
        self.get(names::RSI)
    }

    #[inline]
    pub fn sma(&self) -> Option<f64> {
        self.get(names::SMA)
    }

    #[inline]
    pub fn ema(&self) -> Option<f64> {
        self.get(names::EMA)
    }

    #[inline]
    pub fn macd_histogram(&self) -> Option<f64> {
        self.get(names::MACD_HISTOGRAM)
    }

    /// (lower, middle, upper) Bollinger bands when all three are available.
    pub fn bollinger(&self) -> Option<(f64, f64, f64)> {
        Some((
            self.get(names::BB_LOWER)?,
            self.get(names::BB_MIDDLE)?,
            self.get(names::BB_UPPER)?,
        ))
    }
}

/// One step of the engine input: a bar and the indicators derived from
/// that bar and its predecessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub bar: Bar,
    pub indicators: IndicatorSnapshot,
}

impl FeedItem {
    pub fn new(bar: Bar, indicators: IndicatorSnapshot) -> Self {
        Self { bar, indicators }
    }
}
