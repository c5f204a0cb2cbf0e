//! The indicator set the strategies read, computed bar by bar.

use serde::{Deserialize, Serialize};

use crate::{Atr, BollingerBands, Ema, Macd, Rsi, Sma};
use daytrade_core::error::IndicatorError;
use daytrade_core::traits::StreamingIndicator;
use daytrade_core::types::{names, Bar, FeedItem, IndicatorSnapshot};

/// Indicator periods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorParams {
    pub sma_period: usize,
    pub ema_period: usize,
    pub rsi_period: usize,
    pub atr_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bb_period: usize,
    /// Band width in standard deviations
    pub bb_std_dev: f64,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_period: 5,
            ema_period: 20,
            rsi_period: 14,
            atr_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bb_period: 20,
            bb_std_dev: 2.0,
        }
    }
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<(), IndicatorError> {
        let periods = [
            ("sma_period", self.sma_period),
            ("ema_period", self.ema_period),
            ("rsi_period", self.rsi_period),
            ("atr_period", self.atr_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("bb_period", self.bb_period),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(IndicatorError::InvalidParameter(format!(
                "{name} must be greater than 0"
            )));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(IndicatorError::InvalidParameter(format!(
                "macd_fast ({}) must be less than macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        if !(self.bb_std_dev.is_finite() && self.bb_std_dev > 0.0) {
            return Err(IndicatorError::InvalidParameter(format!(
                "bb_std_dev must be positive, got {}",
                self.bb_std_dev
            )));
        }
        Ok(())
    }
}

/// Stateful bundle of every indicator, advanced one bar at a time.
#[derive(Debug, Clone)]
pub struct IndicatorPipeline {
    sma: Sma,
    ema: Ema,
    rsi: Rsi,
    atr: Atr,
    macd: Macd,
    bb: BollingerBands,
}

impl IndicatorPipeline {
    pub fn new(params: &IndicatorParams) -> Result<Self, IndicatorError> {
        params.validate()?;
        Ok(Self {
            sma: Sma::new(params.sma_period),
            ema: Ema::new(params.ema_period),
            rsi: Rsi::new(params.rsi_period),
            atr: Atr::new(params.atr_period),
            macd: Macd::with_periods(params.macd_fast, params.macd_slow, params.macd_signal),
            bb: BollingerBands::new(params.bb_period, params.bb_std_dev),
        })
    }

    /// Advance every indicator by one bar and snapshot the ready values.
    pub fn next(&mut self, bar: &Bar) -> IndicatorSnapshot {
        let close = bar.close;
        let mut snapshot = IndicatorSnapshot::new();

        snapshot.insert_opt(names::SMA, self.sma.update(close));
        snapshot.insert_opt(names::EMA, self.ema.update(close));
        snapshot.insert_opt(names::RSI, self.rsi.update(close));
        snapshot.insert_opt(names::ATR, self.atr.update_bar(bar));

        if let Some(macd) = self.macd.update(close) {
            snapshot.insert(names::MACD, macd.macd);
            snapshot.insert(names::MACD_SIGNAL, macd.signal);
            snapshot.insert(names::MACD_HISTOGRAM, macd.histogram);
        }
        if let Some(bands) = self.bb.update(close) {
            snapshot.insert(names::BB_UPPER, bands.upper);
            snapshot.insert(names::BB_MIDDLE, bands.middle);
            snapshot.insert(names::BB_LOWER, bands.lower);
        }

        snapshot
    }

    /// Bars needed before every indicator is ready.
    pub fn warmup_period(&self) -> usize {
        [
            self.sma.period(),
            self.ema.period(),
            self.rsi.period(),
            self.atr.period(),
            self.macd.period(),
            self.bb.period(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.sma.reset();
        self.ema.reset();
        self.rsi.reset();
        self.atr.reset();
        self.macd.reset();
        self.bb.reset();
    }
}

/// Pair every bar with the indicators computed from it and its predecessors.
pub fn build_feed(bars: &[Bar], params: &IndicatorParams) -> Result<Vec<FeedItem>, IndicatorError> {
    let mut pipeline = IndicatorPipeline::new(params)?;
    Ok(bars
        .iter()
        .map(|bar| FeedItem::new(*bar, pipeline.next(bar)))
        .collect())
}
