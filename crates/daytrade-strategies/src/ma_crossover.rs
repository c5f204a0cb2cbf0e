//! Moving Average Crossover Strategy.
//!
//! Reads the fast SMA and slow EMA from the indicator snapshot. Long when
//! the SMA crosses above the EMA, short when it crosses below.

use serde::{Deserialize, Serialize};

use daytrade_core::error::StrategyError;
use daytrade_core::traits::SignalGenerator;
use daytrade_core::types::{Bar, IndicatorSnapshot, Signal};

/// Configuration for the MA Crossover strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaCrossoverConfig {
    /// Minimum crossover magnitude relative to the slow MA
    pub signal_threshold: f64,
}

impl Default for MaCrossoverConfig {
    fn default() -> Self {
        Self {
            signal_threshold: 0.001, // 0.1%
        }
    }
}

impl MaCrossoverConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if !(0.0..1.0).contains(&self.signal_threshold) {
            return Err(StrategyError::InvalidConfig(
                "signal_threshold must be in [0, 1)".into(),
            ));
        }
        Ok(())
    }
}

/// Moving Average Crossover Strategy.
#[derive(Debug, Clone)]
pub struct MaCrossoverStrategy {
    config: MaCrossoverConfig,
    prev: Option<(f64, f64)>,
}

impl MaCrossoverStrategy {
    pub fn new(config: MaCrossoverConfig) -> Self {
        Self { config, prev: None }
    }
}

impl SignalGenerator for MaCrossoverStrategy {
    fn name(&self) -> &str {
        "MA Crossover"
    }

    fn evaluate(&mut self, bar: &Bar, indicators: &IndicatorSnapshot) -> Option<Signal> {
        let fast = indicators.sma()?;
        let slow = indicators.ema()?;
        let (prev_fast, prev_slow) = self.prev.replace((fast, slow))?;

        let magnitude = if slow != 0.0 {
            ((fast - slow) / slow).abs()
        } else {
            0.0
        };
        if magnitude < self.config.signal_threshold {
            return None;
        }

        if prev_fast <= prev_slow && fast > slow {
            Some(Signal::long(
                bar.timestamp,
                format!("Bullish crossover: fast MA ({fast:.2}) crossed above slow MA ({slow:.2})"),
            ))
        } else if prev_fast >= prev_slow && fast < slow {
            Some(Signal::short(
                bar.timestamp,
                format!("Bearish crossover: fast MA ({fast:.2}) crossed below slow MA ({slow:.2})"),
            ))
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.prev = None;
    }
}
