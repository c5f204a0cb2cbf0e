//! RSI reversion strategy.
//!
//! Long when RSI drops into oversold, short when it rises into overbought.
//! Positions are released when RSI recrosses the exit level.

use serde::{Deserialize, Serialize};

use daytrade_core::error::StrategyError;
use daytrade_core::traits::SignalGenerator;
use daytrade_core::types::{Bar, IndicatorSnapshot, Signal, SignalDirection};

/// Configuration for the RSI reversion strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiReversionConfig {
    pub oversold: f64,
    pub overbought: f64,
    /// Mid-line whose recross closes positions
    pub exit_level: f64,
}

impl Default for RsiReversionConfig {
    fn default() -> Self {
        Self {
            oversold: 30.0,
            overbought: 70.0,
            exit_level: 50.0,
        }
    }
}

impl RsiReversionConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        let ordered = 0.0 < self.oversold
            && self.oversold < self.exit_level
            && self.exit_level < self.overbought
            && self.overbought < 100.0;
        if !ordered {
            return Err(StrategyError::InvalidConfig(
                "Require 0 < oversold < exit_level < overbought < 100".into(),
            ));
        }
        Ok(())
    }
}

/// RSI reversion strategy.
#[derive(Debug, Clone)]
pub struct RsiReversionStrategy {
    config: RsiReversionConfig,
    prev_rsi: Option<f64>,
}

impl RsiReversionStrategy {
    pub fn new(config: RsiReversionConfig) -> Self {
        Self {
            config,
            prev_rsi: None,
        }
    }
}

impl SignalGenerator for RsiReversionStrategy {
    fn name(&self) -> &str {
        "RSI Reversion"
    }

    fn evaluate(&mut self, bar: &Bar, indicators: &IndicatorSnapshot) -> Option<Signal> {
        let rsi = indicators.rsi()?;
        let prev = self.prev_rsi.replace(rsi)?;
        let c = &self.config;
        let ts = bar.timestamp;

        if prev >= c.oversold && rsi < c.oversold {
            Some(Signal::long(ts, format!("RSI {rsi:.1} entered oversold")))
        } else if prev <= c.overbought && rsi > c.overbought {
            Some(Signal::short(ts, format!("RSI {rsi:.1} entered overbought")))
        } else if prev < c.exit_level && rsi >= c.exit_level {
            Some(Signal::new(
                ts,
                SignalDirection::ExitLong,
                format!("RSI {rsi:.1} recrossed {}", c.exit_level),
            ))
        } else if prev > c.exit_level && rsi <= c.exit_level {
            Some(Signal::new(
                ts,
                SignalDirection::ExitShort,
                format!("RSI {rsi:.1} recrossed {}", c.exit_level),
            ))
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.prev_rsi = None;
    }
}
