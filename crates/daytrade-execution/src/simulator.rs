//! Simulated order fills.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::trace;

use daytrade_core::error::{ConfigError, EngineError};
use daytrade_core::types::{Fill, Position, PositionStatus, Side};

/// Fill model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Fee as a fraction of fill notional, charged on every fill
    pub fee_rate: Decimal,
    /// Flat fee charged on every fill
    pub flat_fee: Decimal,
    /// Adverse price adjustment as a fraction of the desired price
    pub slippage_rate: Decimal,
    /// Largest order as a fraction of bar volume
    pub max_liquidity_fraction: Decimal,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            fee_rate: dec!(0.001),
            flat_fee: Decimal::ZERO,
            slippage_rate: dec!(0.0005),
            max_liquidity_fraction: dec!(0.1),
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fractions = [
            ("fee_rate", self.fee_rate),
            ("slippage_rate", self.slippage_rate),
            ("max_liquidity_fraction", self.max_liquidity_fraction),
        ];
        for (field, value) in fractions {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(ConfigError::OutOfRange {
                    field,
                    range: "[0, 1]",
                    value: value.to_string(),
                });
            }
        }
        if self.flat_fee < Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "flat_fee",
                range: ">= 0",
                value: self.flat_fee.to_string(),
            });
        }
        Ok(())
    }
}

/// Simulated broker for a single symbol.
///
/// Tracks whether a position is active so a second entry is refused.
#[derive(Debug, Clone, Default)]
pub struct ExecutionSimulator {
    config: ExecutionConfig,
    active: bool,
}

impl ExecutionSimulator {
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            active: false,
        }
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn has_open_position(&self) -> bool {
        self.active
    }

    /// Desired price moved against the order: buys pay up, sells give up.
    pub fn slipped_price(&self, side: Side, desired_price: Decimal) -> Decimal {
        match side {
            Side::Buy => desired_price * (Decimal::ONE + self.config.slippage_rate),
            Side::Sell => desired_price * (Decimal::ONE - self.config.slippage_rate),
        }
    }

    /// Percentage plus flat fee for one fill.
    pub fn fee_for(&self, price: Decimal, quantity: Decimal) -> Decimal {
        price * quantity * self.config.fee_rate + self.config.flat_fee
    }

    /// Simulate a fill of `size` against a bar with `book_liquidity` volume.
    ///
    /// Orders above the liquidity cap are rejected whole.
    pub fn fill(
        &self,
        side: Side,
        desired_price: Decimal,
        size: Decimal,
        book_liquidity: Decimal,
    ) -> Result<Fill, EngineError> {
        if size <= Decimal::ZERO {
            return Err(EngineError::invalid_risk(format!(
                "order size must be positive, got {size}"
            )));
        }

        let max_allowed = book_liquidity * self.config.max_liquidity_fraction;
        if size > max_allowed {
            return Err(EngineError::InsufficientLiquidity {
                requested: size,
                max_allowed,
            });
        }

        Ok(self.priced_fill(side, desired_price, size))
    }

    /// Enter `position` (Pending -> Open).
    pub fn open(
        &mut self,
        position: &mut Position,
        desired_price: Decimal,
        book_liquidity: Decimal,
    ) -> Result<Fill, EngineError> {
        if self.active {
            return Err(EngineError::PositionAlreadyOpen);
        }

        let fill = self.fill(
            position.direction.entry_side(),
            desired_price,
            position.size,
            book_liquidity,
        )?;
        position.activate(&fill)?;
        self.active = true;
        Ok(fill)
    }

    /// Exit fill for an open position. Exits are never refused for
    /// liquidity.
    pub fn close(&mut self, position: &Position, current_price: Decimal) -> Result<Fill, EngineError> {
        if !position.is_open() {
            return Err(EngineError::InvalidTransition {
                from: position.status,
                to: PositionStatus::Closed,
            });
        }

        let fill = self.priced_fill(position.direction.exit_side(), current_price, position.size);
        self.active = false;
        Ok(fill)
    }

    fn priced_fill(&self, side: Side, desired_price: Decimal, quantity: Decimal) -> Fill {
        let price = self.slipped_price(side, desired_price);
        let fees = self.fee_for(price, quantity);
        trace!(%side, %desired_price, %price, %quantity, %fees, "Simulated fill");
        Fill {
            side,
            quantity,
            price,
            fees,
        }
    }
}
