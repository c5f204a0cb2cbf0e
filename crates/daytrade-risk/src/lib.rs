//! Risk management for the engine.
//!
//! Provides risk-based position sizing with ATR stops and the trailing
//! stop rules applied to open positions.

mod sizer;
mod trailing;

pub use sizer::{RiskConfig, RiskSizer, SizingDecision};
pub use trailing::TrailingStopRule;
