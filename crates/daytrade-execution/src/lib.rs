//! Execution simulation and the position state machine.
//!
//! [`ExecutionSimulator`] turns orders into fills (liquidity check,
//! slippage, fees). [`PositionManager`] owns the single open position and
//! steps it bar by bar.

mod manager;
mod simulator;

pub use manager::{PositionManager, SameBarPolicy};
pub use simulator::{ExecutionConfig, ExecutionSimulator};
