//! MACD momentum strategy.
//!
//! Trades sign changes of the MACD histogram. A flip that is too small to
//! enter on still releases a position held the other way.

use serde::{Deserialize, Serialize};

use daytrade_core::error::StrategyError;
use daytrade_core::traits::SignalGenerator;
use daytrade_core::types::{Bar, IndicatorSnapshot, Signal, SignalDirection};

/// Configuration for the MACD momentum strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacdMomentumConfig {
    /// Histogram magnitude needed to enter
    pub min_histogram: f64,
}

impl Default for MacdMomentumConfig {
    fn default() -> Self {
        Self { min_histogram: 0.0 }
    }
}

impl MacdMomentumConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if !(self.min_histogram >= 0.0 && self.min_histogram.is_finite()) {
            return Err(StrategyError::InvalidConfig(
                "min_histogram must be a non-negative number".into(),
            ));
        }
        Ok(())
    }
}

/// MACD momentum strategy.
#[derive(Debug, Clone)]
pub struct MacdMomentumStrategy {
    config: MacdMomentumConfig,
    prev_histogram: Option<f64>,
}

impl MacdMomentumStrategy {
    pub fn new(config: MacdMomentumConfig) -> Self {
        Self {
            config,
            prev_histogram: None,
        }
    }
}

impl SignalGenerator for MacdMomentumStrategy {
    fn name(&self) -> &str {
        "MACD Momentum"
    }

    fn evaluate(&mut self, bar: &Bar, indicators: &IndicatorSnapshot) -> Option<Signal> {
        let hist = indicators.macd_histogram()?;
        let prev = self.prev_histogram.replace(hist)?;
        let ts = bar.timestamp;
        let strong = hist.abs() >= self.config.min_histogram;

        if prev <= 0.0 && hist > 0.0 {
            Some(if strong {
                Signal::long(ts, format!("MACD histogram turned positive ({hist:.4})"))
            } else {
                Signal::new(ts, SignalDirection::ExitShort, "MACD histogram turned positive")
            })
        } else if prev >= 0.0 && hist < 0.0 {
            Some(if strong {
                Signal::short(ts, format!("MACD histogram turned negative ({hist:.4})"))
            } else {
                Signal::new(ts, SignalDirection::ExitLong, "MACD histogram turned negative")
            })
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.prev_histogram = None;
    }
}
