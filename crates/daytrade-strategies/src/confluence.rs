//! Confluence strategy.
//!
//! Goes long when enough of three bullish conditions agree:
//! EMA above SMA, RSI oversold, close below the lower Bollinger band.
//! Shorts mirror the rules. When both sides qualify, long wins.

use serde::{Deserialize, Serialize};
use tracing::trace;

use daytrade_core::error::StrategyError;
use daytrade_core::traits::SignalGenerator;
use daytrade_core::types::{Bar, IndicatorSnapshot, Signal};

/// Configuration for the confluence strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// Margin the EMA must clear over (or under) the SMA
    pub ema_sma_threshold: f64,
    /// RSI below this counts as bullish
    pub rsi_long_threshold: f64,
    /// RSI above this counts as bearish
    pub rsi_short_threshold: f64,
    /// Margin past the Bollinger band
    pub bb_threshold: f64,
    /// Conditions that must agree
    pub min_conditions: usize,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            ema_sma_threshold: 0.0,
            rsi_long_threshold: 30.0,
            rsi_short_threshold: 70.0,
            bb_threshold: 0.0,
            min_conditions: 2,
        }
    }
}

impl ConfluenceConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if !(1..=3).contains(&self.min_conditions) {
            return Err(StrategyError::InvalidConfig(format!(
                "min_conditions must be between 1 and 3, got {}",
                self.min_conditions
            )));
        }
        if self.rsi_long_threshold >= self.rsi_short_threshold {
            return Err(StrategyError::InvalidConfig(
                "rsi_long_threshold must be below rsi_short_threshold".into(),
            ));
        }
        if self.ema_sma_threshold < 0.0 || self.bb_threshold < 0.0 {
            return Err(StrategyError::InvalidConfig(
                "Thresholds must not be negative".into(),
            ));
        }
        Ok(())
    }
}

/// Confluence strategy.
#[derive(Debug, Clone)]
pub struct ConfluenceStrategy {
    config: ConfluenceConfig,
    signals_generated: usize,
}

impl ConfluenceStrategy {
    pub fn new(config: ConfluenceConfig) -> Self {
        Self {
            config,
            signals_generated: 0,
        }
    }

    pub fn config(&self) -> &ConfluenceConfig {
        &self.config
    }

    pub fn signals_generated(&self) -> usize {
        self.signals_generated
    }

    /// (bullish, bearish) condition counts. None until every input is ready.
    fn votes(&self, close: f64, indicators: &IndicatorSnapshot) -> Option<(usize, usize)> {
        let ema = indicators.ema()?;
        let sma = indicators.sma()?;
        let rsi = indicators.rsi()?;
        let (lower, _, upper) = indicators.bollinger()?;
        let c = &self.config;

        let bullish = [
            ema > sma + c.ema_sma_threshold,
            rsi < c.rsi_long_threshold,
            close < lower - c.bb_threshold,
        ];
        let bearish = [
            ema < sma - c.ema_sma_threshold,
            rsi > c.rsi_short_threshold,
            close >= upper + c.bb_threshold,
        ];
        let count = |conds: [bool; 3]| conds.iter().filter(|&&b| b).count();
        Some((count(bullish), count(bearish)))
    }
}

impl SignalGenerator for ConfluenceStrategy {
    fn name(&self) -> &str {
        "Confluence"
    }

    fn evaluate(&mut self, bar: &Bar, indicators: &IndicatorSnapshot) -> Option<Signal> {
        let (bullish, bearish) = self.votes(bar.close, indicators)?;
        let needed = self.config.min_conditions;
        trace!(bullish, bearish, "Confluence votes");

        let signal = if bullish >= needed {
            Signal::long(bar.timestamp, format!("{bullish}/3 bullish conditions"))
        } else if bearish >= needed {
            Signal::short(bar.timestamp, format!("{bearish}/3 bearish conditions"))
        } else {
            return None;
        };

        self.signals_generated += 1;
        Some(signal)
    }

    fn reset(&mut self) {
        self.signals_generated = 0;
    }
}
