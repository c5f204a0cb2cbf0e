//! Trailing stop rules.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use daytrade_core::types::{Direction, Position};

/// How the stop follows the price once a position is in profit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrailingStopRule {
    /// Stop never moves
    #[default]
    Disabled,
    /// Trail by a fraction of the reference price
    Fraction { distance: Decimal },
    /// Trail by a multiple of ATR
    Atr { multiplier: Decimal },
}

impl TrailingStopRule {
    /// Pick a rule from the flat engine options. An ATR multiplier wins
    /// over a fractional distance; zero disables.
    pub fn from_options(trailing_distance: Decimal, atr_multiplier: Option<Decimal>) -> Self {
        match atr_multiplier {
            Some(multiplier) if multiplier > Decimal::ZERO => TrailingStopRule::Atr { multiplier },
            _ if trailing_distance > Decimal::ZERO => TrailingStopRule::Fraction {
                distance: trailing_distance,
            },
            _ => TrailingStopRule::Disabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, TrailingStopRule::Disabled)
    }

    /// Distance between the reference price and the trailed stop.
    fn offset(&self, reference: Decimal, atr: Option<Decimal>) -> Option<Decimal> {
        let offset = match self {
            TrailingStopRule::Disabled => return None,
            TrailingStopRule::Fraction { distance } => reference * *distance,
            TrailingStopRule::Atr { multiplier } => atr? * *multiplier,
        };
        (offset > Decimal::ZERO).then_some(offset)
    }

    /// Candidate stop for a position entered at `entry_price`, or None
    /// while the favorable move from entry is smaller than the trailing
    /// distance.
    pub fn candidate(
        &self,
        direction: Direction,
        entry_price: Decimal,
        reference: Decimal,
        atr: Option<Decimal>,
    ) -> Option<Decimal> {
        let offset = self.offset(reference, atr)?;
        let sign = direction.sign();
        let favorable = (reference - entry_price) * sign;
        if favorable < offset {
            return None;
        }
        Some(reference - sign * offset)
    }

    /// Ratchet the position's stop toward `reference`. Returns true if it
    /// moved.
    pub fn apply(&self, position: &mut Position, reference: Decimal, atr: Option<Decimal>) -> bool {
        match self.candidate(position.direction, position.entry_price, reference, atr) {
            Some(level) => position.ratchet_stop(level),
            None => false,
        }
    }
}
