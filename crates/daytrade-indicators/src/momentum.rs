//! Momentum indicators.

use serde::{Deserialize, Serialize};

use crate::moving_average::Ema;
use daytrade_core::traits::StreamingIndicator;

/// Relative Strength Index (RSI) with Wilder smoothing.
///
/// Needs `period + 1` values: the first `period` changes seed the
/// averages, later changes use `avg = (avg * (n - 1) + x) / n`.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev: Option<f64>,
    changes: usize,
    gain_sum: f64,
    loss_sum: f64,
    averages: Option<(f64, f64)>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            prev: None,
            changes: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            averages: None,
        }
    }
}

impl StreamingIndicator for Rsi {
    type Output = f64;

    fn update(&mut self, value: f64) -> Option<f64> {
        let prev = self.prev.replace(value)?;
        let change = value - prev;
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        self.changes += 1;

        let n = self.period as f64;
        self.averages = match self.averages {
            Some((avg_gain, avg_loss)) => Some((
                (avg_gain * (n - 1.0) + gain) / n,
                (avg_loss * (n - 1.0) + loss) / n,
            )),
            None => {
                self.gain_sum += gain;
                self.loss_sum += loss;
                (self.changes == self.period).then(|| (self.gain_sum / n, self.loss_sum / n))
            }
        };
        self.current()
    }

    fn current(&self) -> Option<f64> {
        self.averages.map(|(gain, loss)| {
            if loss == 0.0 {
                // A flat window is neutral, not overbought
                if gain == 0.0 {
                    50.0
                } else {
                    100.0
                }
            } else {
                100.0 - 100.0 / (1.0 + gain / loss)
            }
        })
    }

    fn reset(&mut self) {
        *self = Self::new(self.period);
    }

    fn is_ready(&self) -> bool {
        self.averages.is_some()
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

/// MACD output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    /// MACD line (fast EMA - slow EMA)
    pub macd: f64,
    /// Signal line (EMA of MACD)
    pub signal: f64,
    /// Histogram (MACD - Signal)
    pub histogram: f64,
}

/// MACD indicator.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    current: Option<MacdOutput>,
}

impl Macd {
    /// Create a new MACD with default parameters (12, 26, 9).
    pub fn new() -> Self {
        Self::with_periods(12, 26, 9)
    }

    /// Create a MACD with custom periods.
    pub fn with_periods(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast < slow, "Fast period must be less than slow period");
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
            current: None,
        }
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingIndicator for Macd {
    type Output = MacdOutput;

    fn update(&mut self, value: f64) -> Option<MacdOutput> {
        let fast = self.fast.update(value);
        let slow = self.slow.update(value);
        let (fast, slow) = fast.zip(slow)?;

        let macd = fast - slow;
        self.current = self.signal.update(macd).map(|signal| MacdOutput {
            macd,
            signal,
            histogram: macd - signal,
        });
        self.current
    }

    fn current(&self) -> Option<MacdOutput> {
        self.current
    }

    fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.signal.reset();
        self.current = None;
    }

    fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    fn period(&self) -> usize {
        self.slow.period() + self.signal.period() - 1
    }

    fn name(&self) -> &str {
        "MACD"
    }
}
