//! Core traits for the engine.

mod indicator;
mod strategy;

pub use indicator::StreamingIndicator;
pub use strategy::SignalGenerator;
