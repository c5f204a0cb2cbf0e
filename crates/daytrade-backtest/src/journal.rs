//! Ordered record of everything the engine did or refused to do.

use serde::{Deserialize, Serialize};

use daytrade_core::error::EngineError;
use daytrade_core::types::{SignalDirection, Trade};

/// An entry signal that did not produce a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoTradeEvent {
    /// Bar timestamp (Unix milliseconds)
    pub timestamp: i64,
    pub direction: SignalDirection,
    pub error: EngineError,
}

/// One journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JournalEvent {
    Trade(Trade),
    NoTrade(NoTradeEvent),
}

/// Append-only journal of closed trades and rejected entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeJournal {
    events: Vec<JournalEvent>,
}

impl TradeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.events.push(JournalEvent::Trade(trade));
    }

    pub fn record_no_trade(&mut self, timestamp: i64, direction: SignalDirection, error: EngineError) {
        self.events.push(JournalEvent::NoTrade(NoTradeEvent {
            timestamp,
            direction,
            error,
        }));
    }

    pub fn events(&self) -> &[JournalEvent] {
        &self.events
    }

    /// Closed trades in the order they closed.
    pub fn trades(&self) -> impl Iterator<Item = &Trade> {
        self.events.iter().filter_map(|e| match e {
            JournalEvent::Trade(t) => Some(t),
            JournalEvent::NoTrade(_) => None,
        })
    }

    pub fn no_trades(&self) -> impl Iterator<Item = &NoTradeEvent> {
        self.events.iter().filter_map(|e| match e {
            JournalEvent::NoTrade(n) => Some(n),
            JournalEvent::Trade(_) => None,
        })
    }

    pub fn trade_count(&self) -> usize {
        self.trades().count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
