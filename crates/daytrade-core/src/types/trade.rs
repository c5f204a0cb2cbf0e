//! Fills and closed trades.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Direction, Side};

/// A simulated execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub side: Side,
    /// Quantity filled
    pub quantity: Decimal,
    /// Price after slippage
    pub price: Decimal,
    /// Fees charged on this fill
    pub fees: Decimal,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    Signal,
    TrailingStop,
    /// Closed at the last bar of the run
    EndOfData,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::Signal => "signal",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::EndOfData => "end_of_data",
        };
        write!(f, "{}", s)
    }
}

/// A finished round trip. Immutable once journaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Id of the position this trade closed
    pub id: u64,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub size: Decimal,
    /// Unix milliseconds
    pub entry_time: i64,
    /// Unix milliseconds
    pub exit_time: i64,
    /// Entry plus exit fees
    pub fees_paid: Decimal,
    /// Net of fees
    pub pnl: Decimal,
    pub exit_reason: ExitReason,
}

impl Trade {
    /// Profit before fees.
    pub fn gross_pnl(&self) -> Decimal {
        (self.exit_price - self.entry_price) * self.size * self.direction.sign()
    }

    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    pub fn is_loss(&self) -> bool {
        self.pnl < Decimal::ZERO
    }

}
