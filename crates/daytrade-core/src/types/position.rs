//! Position state machine: `Pending -> Open -> Closed`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Direction, ExitReason, Fill, Trade};
use crate::error::EngineError;

/// Lifecycle state of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    /// Sized but not yet filled
    Pending,
    /// Filled and being managed
    Open,
    /// Terminal
    Closed,
}

/// A single directional position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: u64,
    pub direction: Direction,
    /// Fill price (zero while pending)
    pub entry_price: Decimal,
    pub size: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    /// Last level set by the trailing rule, if it has engaged
    pub trailing_stop: Option<Decimal>,
    /// Unix milliseconds
    pub open_time: i64,
    pub status: PositionStatus,
    /// Fees charged at entry
    pub entry_fee: Decimal,
}

impl Position {
    /// Create a pending position from a sizing decision.
    pub fn pending(
        id: u64,
        direction: Direction,
        size: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
        open_time: i64,
    ) -> Self {
        Self {
            id,
            direction,
            entry_price: Decimal::ZERO,
            size,
            stop_loss,
            take_profit,
            trailing_stop: None,
            open_time,
            status: PositionStatus::Pending,
            entry_fee: Decimal::ZERO,
        }
    }

    /// Check `size > 0` and the ordering of stop, entry and target.
    pub fn check_levels(
        direction: Direction,
        entry: Decimal,
        size: Decimal,
        stop_loss: Decimal,
        take_profit: Decimal,
    ) -> Result<(), EngineError> {
        if size <= Decimal::ZERO {
            return Err(EngineError::invalid_risk(format!(
                "size must be positive, got {size}"
            )));
        }
        let ordered = match direction {
            Direction::Long => stop_loss < entry && entry < take_profit,
            Direction::Short => take_profit < entry && entry < stop_loss,
        };
        if !ordered {
            return Err(EngineError::invalid_risk(format!(
                "{direction} levels out of order: stop {stop_loss}, entry {entry}, target {take_profit}"
            )));
        }
        Ok(())
    }

    /// Pending -> Open on an entry fill.
    pub fn activate(&mut self, fill: &Fill) -> Result<(), EngineError> {
        if self.status != PositionStatus::Pending {
            return Err(EngineError::InvalidTransition {
                from: self.status,
                to: PositionStatus::Open,
            });
        }
        Self::check_levels(
            self.direction,
            fill.price,
            fill.quantity,
            self.stop_loss,
            self.take_profit,
        )?;

        self.entry_price = fill.price;
        self.size = fill.quantity;
        self.entry_fee = fill.fees;
        self.status = PositionStatus::Open;
        Ok(())
    }

    /// Open -> Closed on an exit fill. Produces the journal record.
    pub fn close(
        &mut self,
        fill: &Fill,
        exit_time: i64,
        reason: ExitReason,
    ) -> Result<Trade, EngineError> {
        if self.status != PositionStatus::Open {
            return Err(EngineError::InvalidTransition {
                from: self.status,
                to: PositionStatus::Closed,
            });
        }

        let fees_paid = self.entry_fee + fill.fees;
        let pnl = self.gross_pnl(fill.price) - fees_paid;
        self.status = PositionStatus::Closed;

        Ok(Trade {
            id: self.id,
            direction: self.direction,
            entry_price: self.entry_price,
            exit_price: fill.price,
            size: self.size,
            entry_time: self.open_time,
            exit_time,
            fees_paid,
            pnl,
            exit_reason: reason,
        })
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Profit before fees if closed at `price`.
    pub fn gross_pnl(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * self.size * self.direction.sign()
    }

    /// Mark-to-market value at `mark`, net of the entry fee already paid.
    pub fn unrealized_pnl(&self, mark: Decimal) -> Decimal {
        if !self.is_open() {
            return Decimal::ZERO;
        }
        self.gross_pnl(mark) - self.entry_fee
    }

    /// Move the stop toward the market. Never loosens it.
    ///
    /// Returns true when the stop moved.
    pub fn ratchet_stop(&mut self, candidate: Decimal) -> bool {
        let tighter = match self.direction {
            Direction::Long => candidate > self.stop_loss,
            Direction::Short => candidate < self.stop_loss,
        };
        if tighter {
            self.stop_loss = candidate;
            self.trailing_stop = Some(candidate);
        }
        tighter
    }

    /// Whether the bar's adverse extreme breaches the stop.
    ///
    /// A bar that opens beyond the stop still exits at the stop level, not
    /// at the gapped open.
    pub fn stop_breached(&self, low: Decimal, high: Decimal) -> bool {
        match self.direction {
            Direction::Long => low <= self.stop_loss,
            Direction::Short => high >= self.stop_loss,
        }
    }

    /// Whether the bar's favorable extreme reaches the target.
    pub fn target_reached(&self, low: Decimal, high: Decimal) -> bool {
        match self.direction {
            Direction::Long => high >= self.take_profit,
            Direction::Short => low <= self.take_profit,
        }
    }
}
