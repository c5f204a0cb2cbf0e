//! Signal generator trait.

use crate::types::{Bar, IndicatorSnapshot, Signal};

/// Source of directional signals.
///
/// The engine calls `evaluate` exactly once per bar, in order, with the
/// bar and the indicator snapshot computed from bars up to and including
/// it. Implementations never see later bars.
pub trait SignalGenerator: Send {
    /// Get the unique name of this generator.
    fn name(&self) -> &str;

    /// Process a new bar and optionally emit a signal.
    fn evaluate(&mut self, bar: &Bar, indicators: &IndicatorSnapshot) -> Option<Signal>;

    /// Reset any internal state before a new run.
    fn reset(&mut self) {}

    /// Number of bars needed before signals can be emitted.
    fn warmup_period(&self) -> usize {
        0
    }

    /// Check if enough bars have been seen.
    fn is_warmed_up(&self, bars_seen: usize) -> bool {
        bars_seen >= self.warmup_period()
    }
}
