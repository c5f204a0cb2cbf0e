//! Trading signal types.

use serde::{Deserialize, Serialize};

use super::Direction;

/// What a signal asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalDirection {
    /// Open a long position
    Long,
    /// Open a short position
    Short,
    /// Close an open long position
    ExitLong,
    /// Close an open short position
    ExitShort,
}

impl SignalDirection {
    /// The position direction an entry signal opens, if any.
    pub fn entry(&self) -> Option<Direction> {
        match self {
            SignalDirection::Long => Some(Direction::Long),
            SignalDirection::Short => Some(Direction::Short),
            SignalDirection::ExitLong | SignalDirection::ExitShort => None,
        }
    }

    /// Whether this signal closes a position held in `held`.
    ///
    /// Both explicit exits and opposing entries count.
    pub fn closes(&self, held: Direction) -> bool {
        matches!(
            (self, held),
            (SignalDirection::ExitLong, Direction::Long)
                | (SignalDirection::Short, Direction::Long)
                | (SignalDirection::ExitShort, Direction::Short)
                | (SignalDirection::Long, Direction::Short)
        )
    }
}

impl std::fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalDirection::Long => write!(f, "LONG"),
            SignalDirection::Short => write!(f, "SHORT"),
            SignalDirection::ExitLong => write!(f, "EXIT_LONG"),
            SignalDirection::ExitShort => write!(f, "EXIT_SHORT"),
        }
    }
}

/// A directional signal emitted for one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Timestamp of the bar that produced the signal (Unix milliseconds)
    pub timestamp: i64,
    pub direction: SignalDirection,
    /// Human-readable explanation
    pub reason: String,
}

impl Signal {
    pub fn new(timestamp: i64, direction: SignalDirection, reason: impl Into<String>) -> Self {
        Self {
            timestamp,
            direction,
            reason: reason.into(),
        }
    }

    pub fn long(timestamp: i64, reason: impl Into<String>) -> Self {
        Self::new(timestamp, SignalDirection::Long, reason)
    }

    pub fn short(timestamp: i64, reason: impl Into<String>) -> Self {
        Self::new(timestamp, SignalDirection::Short, reason)
    }
}
