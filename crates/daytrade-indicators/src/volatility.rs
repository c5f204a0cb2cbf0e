//! Volatility indicators.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use daytrade_core::traits::StreamingIndicator;
use daytrade_core::types::Bar;

/// Average True Range (ATR) with Wilder smoothing.
///
/// Feed whole bars with [`Atr::update_bar`]. The [`StreamingIndicator`]
/// impl takes precomputed true-range values.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    count: usize,
    sum: f64,
    current: Option<f64>,
}

impl Atr {
    /// Create a new ATR indicator. 14 is the usual period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            prev_close: None,
            count: 0,
            sum: 0.0,
            current: None,
        }
    }

    /// Update with a full bar. The first bar's true range is its range.
    pub fn update_bar(&mut self, bar: &Bar) -> Option<f64> {
        let tr = bar.true_range(self.prev_close);
        self.prev_close = Some(bar.close);
        self.update(tr)
    }
}

impl StreamingIndicator for Atr {
    type Output = f64;

    fn update(&mut self, true_range: f64) -> Option<f64> {
        self.count += 1;
        let n = self.period as f64;

        self.current = match self.current {
            Some(atr) => Some((atr * (n - 1.0) + true_range) / n),
            None => {
                self.sum += true_range;
                (self.count == self.period).then(|| self.sum / n)
            }
        };
        self.current
    }

    fn current(&self) -> Option<f64> {
        self.current
    }

    fn reset(&mut self) {
        *self = Self::new(self.period);
    }

    fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "ATR"
    }
}

/// Rolling population standard deviation.
#[derive(Debug, Clone)]
pub struct StdDev {
    period: usize,
    window: VecDeque<f64>,
}

impl StdDev {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            window: VecDeque::with_capacity(period + 1),
        }
    }

    /// Mean and population standard deviation of the current window.
    fn stats(&self) -> Option<(f64, f64)> {
        if !self.is_ready() {
            return None;
        }
        let n = self.period as f64;
        let mean = self.window.iter().sum::<f64>() / n;
        let variance = self.window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        Some((mean, variance.sqrt()))
    }
}

impl StreamingIndicator for StdDev {
    type Output = f64;

    fn update(&mut self, value: f64) -> Option<f64> {
        self.window.push_back(value);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
        self.current()
    }

    fn current(&self) -> Option<f64> {
        self.stats().map(|(_, sd)| sd)
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn is_ready(&self) -> bool {
        self.window.len() == self.period
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "StdDev"
    }
}

/// Bollinger Bands output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: f64,
    /// Middle band (SMA)
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger Bands: SMA plus and minus `k` standard deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    std_dev: StdDev,
    multiplier: f64,
}

impl BollingerBands {
    /// Create Bollinger Bands. The usual setup is (20, 2.0).
    pub fn new(period: usize, multiplier: f64) -> Self {
        assert!(multiplier > 0.0, "Multiplier must be positive");
        Self {
            std_dev: StdDev::new(period),
            multiplier,
        }
    }
}

impl StreamingIndicator for BollingerBands {
    type Output = BollingerOutput;

    fn update(&mut self, value: f64) -> Option<BollingerOutput> {
        self.std_dev.update(value);
        self.current()
    }

    fn current(&self) -> Option<BollingerOutput> {
        self.std_dev.stats().map(|(mean, sd)| BollingerOutput {
            upper: mean + self.multiplier * sd,
            middle: mean,
            lower: mean - self.multiplier * sd,
        })
    }

    fn reset(&mut self) {
        self.std_dev.reset();
    }

    fn is_ready(&self) -> bool {
        self.std_dev.is_ready()
    }

    fn period(&self) -> usize {
        self.std_dev.period()
    }

    fn name(&self) -> &str {
        "BB"
    }
}
