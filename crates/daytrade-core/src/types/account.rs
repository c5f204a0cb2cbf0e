//! Account capital and equity curve.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Marked-to-market equity at the close of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Unix milliseconds
    pub timestamp: i64,
    pub equity: Decimal,
}

/// Cash capital plus the running equity curve.
///
/// `capital` only moves when a trade closes; open positions contribute
/// to the equity curve through their unrealized PnL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub initial_capital: Decimal,
    pub capital: Decimal,
    pub equity_curve: Vec<EquityPoint>,
}

impl Account {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            capital: initial_capital,
            equity_curve: Vec::new(),
        }
    }

    /// Book realized PnL.
    pub fn apply_pnl(&mut self, pnl: Decimal) {
        self.capital += pnl;
    }

    /// Append an equity point. Timestamps must not go backwards.
    pub fn record_equity(&mut self, timestamp: i64, equity: Decimal) -> Result<(), EngineError> {
        if let Some(last) = self.equity_curve.last() {
            if timestamp < last.timestamp {
                return Err(EngineError::data_gap(
                    timestamp,
                    format!("equity point precedes last point at {}", last.timestamp),
                ));
            }
        }
        self.equity_curve.push(EquityPoint { timestamp, equity });
        Ok(())
    }

    /// Latest recorded equity, or capital when nothing has been recorded.
    pub fn equity(&self) -> Decimal {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.capital)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_apply_pnl_and_equity() {
        let mut account = Account::new(dec!(10000));
        assert_eq!(account.equity(), dec!(10000));

        account.apply_pnl(dec!(196));
        account.record_equity(1, dec!(10196)).unwrap();
        assert_eq!(account.capital, dec!(10196));
        assert_eq!(account.equity(), dec!(10196));
    }

    #[test]
    fn test_equity_timestamps_must_not_regress() {
        let mut account = Account::new(dec!(1000));
        account.record_equity(10, dec!(1000)).unwrap();
        account.record_equity(10, dec!(1001)).unwrap();
        let err = account.record_equity(9, dec!(1000)).unwrap_err();
        assert!(matches!(err, EngineError::DataGap { timestamp: 9, .. }));
        assert_eq!(account.equity_curve.len(), 2);
    }
}
