//! Closed set of strategy variants.

use serde::{Deserialize, Serialize};

use crate::{
    ConfluenceConfig, ConfluenceStrategy, MaCrossoverConfig, MaCrossoverStrategy,
    MacdMomentumConfig, MacdMomentumStrategy, RsiReversionConfig, RsiReversionStrategy,
};
use daytrade_core::error::StrategyError;
use daytrade_core::traits::SignalGenerator;
use daytrade_core::types::{Bar, IndicatorSnapshot, Signal};

/// Strategy selection as it appears in configuration.
///
/// ```toml
/// [strategy]
/// kind = "confluence"
/// rsi_long_threshold = 25.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategySpec {
    Confluence(ConfluenceConfig),
    MaCrossover(MaCrossoverConfig),
    RsiReversion(RsiReversionConfig),
    MacdMomentum(MacdMomentumConfig),
}

impl Default for StrategySpec {
    fn default() -> Self {
        StrategySpec::Confluence(ConfluenceConfig::default())
    }
}

impl StrategySpec {
    /// Configuration key of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            StrategySpec::Confluence(_) => "confluence",
            StrategySpec::MaCrossover(_) => "ma_crossover",
            StrategySpec::RsiReversion(_) => "rsi_reversion",
            StrategySpec::MacdMomentum(_) => "macd_momentum",
        }
    }

    pub fn validate(&self) -> Result<(), StrategyError> {
        match self {
            StrategySpec::Confluence(c) => c.validate(),
            StrategySpec::MaCrossover(c) => c.validate(),
            StrategySpec::RsiReversion(c) => c.validate(),
            StrategySpec::MacdMomentum(c) => c.validate(),
        }
    }

    /// Validate and instantiate.
    pub fn build(&self) -> Result<Strategy, StrategyError> {
        self.validate()?;
        Ok(match self.clone() {
            StrategySpec::Confluence(c) => Strategy::Confluence(ConfluenceStrategy::new(c)),
            StrategySpec::MaCrossover(c) => Strategy::MaCrossover(MaCrossoverStrategy::new(c)),
            StrategySpec::RsiReversion(c) => Strategy::RsiReversion(RsiReversionStrategy::new(c)),
            StrategySpec::MacdMomentum(c) => Strategy::MacdMomentum(MacdMomentumStrategy::new(c)),
        })
    }
}

/// A ready-to-run strategy.
#[derive(Debug, Clone)]
pub enum Strategy {
    Confluence(ConfluenceStrategy),
    MaCrossover(MaCrossoverStrategy),
    RsiReversion(RsiReversionStrategy),
    MacdMomentum(MacdMomentumStrategy),
}

impl Strategy {
    fn inner(&self) -> &dyn SignalGenerator {
        match self {
            Strategy::Confluence(s) => s,
            Strategy::MaCrossover(s) => s,
            Strategy::RsiReversion(s) => s,
            Strategy::MacdMomentum(s) => s,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn SignalGenerator {
        match self {
            Strategy::Confluence(s) => s,
            Strategy::MaCrossover(s) => s,
            Strategy::RsiReversion(s) => s,
            Strategy::MacdMomentum(s) => s,
        }
    }
}

impl SignalGenerator for Strategy {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn evaluate(&mut self, bar: &Bar, indicators: &IndicatorSnapshot) -> Option<Signal> {
        self.inner_mut().evaluate(bar, indicators)
    }

    fn reset(&mut self) {
        self.inner_mut().reset()
    }

    fn warmup_period(&self) -> usize {
        self.inner().warmup_period()
    }
}
