//! Moving average indicators.

use std::collections::VecDeque;

use daytrade_core::traits::StreamingIndicator;

/// Simple Moving Average (SMA).
///
/// Arithmetic mean of the last N values.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl Sma {
    /// Create a new SMA with the specified period.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            window: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        }
    }
}

impl StreamingIndicator for Sma {
    type Output = f64;

    fn update(&mut self, value: f64) -> Option<f64> {
        self.window.push_back(value);
        self.sum += value;
        if self.window.len() > self.period {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
            }
        }
        self.current()
    }

    fn current(&self) -> Option<f64> {
        self.is_ready().then(|| self.sum / self.period as f64)
    }

    fn reset(&mut self) {
        self.window.clear();
        self.sum = 0.0;
    }

    fn is_ready(&self) -> bool {
        self.window.len() == self.period
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "SMA"
    }
}

/// Exponential Moving Average (EMA).
///
/// Seeded with the SMA of the first `period` values, then
/// `ema = value * k + ema * (1 - k)` with `k = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: f64,
    current: Option<f64>,
    count: usize,
    sum: f64,
}

impl Ema {
    /// Create a new EMA.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            multiplier: 2.0 / (period as f64 + 1.0),
            current: None,
            count: 0,
            sum: 0.0,
        }
    }
}

impl StreamingIndicator for Ema {
    type Output = f64;

    fn update(&mut self, value: f64) -> Option<f64> {
        self.count += 1;

        self.current = match self.current {
            Some(ema) => Some(value * self.multiplier + ema * (1.0 - self.multiplier)),
            None => {
                self.sum += value;
                (self.count == self.period).then(|| self.sum / self.period as f64)
            }
        };
        self.current
    }

    fn current(&self) -> Option<f64> {
        self.current
    }

    fn reset(&mut self) {
        self.current = None;
        self.count = 0;
        self.sum = 0.0;
    }

    fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}
