//! Risk-based position sizing.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use daytrade_core::error::{ConfigError, EngineError};
use daytrade_core::types::{Account, Direction, Signal};

/// Sizing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fraction of capital risked per trade
    pub risk_per_trade: Decimal,
    /// Stop distance in ATRs
    pub atr_multiplier_stop: Decimal,
    /// Target distance as a multiple of the stop distance
    pub reward_risk_ratio: Decimal,
    /// Extra stop distance as a fraction of price
    pub min_stop_fraction: Decimal,
    /// Maximum notional as a multiple of capital
    pub max_leverage: Decimal,
    /// Sizes are floored to this many decimal places
    pub size_decimals: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_per_trade: dec!(0.01),
            atr_multiplier_stop: dec!(2),
            reward_risk_ratio: dec!(2),
            min_stop_fraction: Decimal::ZERO,
            max_leverage: Decimal::ONE,
            size_decimals: 8,
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.risk_per_trade <= Decimal::ZERO || self.risk_per_trade > Decimal::ONE {
            return Err(ConfigError::OutOfRange {
                field: "risk_per_trade",
                range: "(0, 1]",
                value: self.risk_per_trade.to_string(),
            });
        }
        if self.atr_multiplier_stop < Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "atr_multiplier_stop",
                range: ">= 0",
                value: self.atr_multiplier_stop.to_string(),
            });
        }
        if self.reward_risk_ratio <= Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "reward_risk_ratio",
                range: "> 0",
                value: self.reward_risk_ratio.to_string(),
            });
        }
        if self.min_stop_fraction < Decimal::ZERO || self.min_stop_fraction >= Decimal::ONE {
            return Err(ConfigError::OutOfRange {
                field: "min_stop_fraction",
                range: "[0, 1)",
                value: self.min_stop_fraction.to_string(),
            });
        }
        if self.max_leverage <= Decimal::ZERO {
            return Err(ConfigError::OutOfRange {
                field: "max_leverage",
                range: "> 0",
                value: self.max_leverage.to_string(),
            });
        }
        if self.atr_multiplier_stop.is_zero() && self.min_stop_fraction.is_zero() {
            return Err(ConfigError::Invalid(
                "atr_multiplier_stop and min_stop_fraction cannot both be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output of a successful sizing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingDecision {
    pub direction: Direction,
    pub size: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    /// Price the levels were computed from
    pub reference_price: Decimal,
    /// Capital put at risk (capital * risk_per_trade)
    pub risk_amount: Decimal,
}

impl SizingDecision {
    pub fn notional(&self) -> Decimal {
        self.size * self.reference_price
    }
}

/// Computes stop, target and size for a new position.
///
/// Pure: the same inputs always give the same decision.
#[derive(Debug, Clone, Default)]
pub struct RiskSizer {
    config: RiskConfig,
}

impl RiskSizer {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// `k * ATR + min_stop_fraction * price`.
    pub fn stop_distance(&self, atr: Decimal, price: Decimal) -> Decimal {
        self.config.atr_multiplier_stop * atr + self.config.min_stop_fraction * price
    }

    /// Size a position for an entry signal.
    pub fn size_position(
        &self,
        signal: &Signal,
        account: &Account,
        atr: Decimal,
        current_price: Decimal,
    ) -> Result<SizingDecision, EngineError> {
        let direction = signal.direction.entry().ok_or_else(|| {
            EngineError::invalid_risk(format!("{} signal does not open a position", signal.direction))
        })?;
        self.size_for(direction, account.capital, atr, current_price)
    }

    /// Size a position in `direction` against `capital`.
    pub fn size_for(
        &self,
        direction: Direction,
        capital: Decimal,
        atr: Decimal,
        current_price: Decimal,
    ) -> Result<SizingDecision, EngineError> {
        if current_price <= Decimal::ZERO {
            return Err(EngineError::invalid_risk(format!(
                "price must be positive, got {current_price}"
            )));
        }
        if atr < Decimal::ZERO {
            return Err(EngineError::invalid_risk(format!(
                "ATR must not be negative, got {atr}"
            )));
        }
        if capital <= Decimal::ZERO {
            return Err(EngineError::InsufficientCapital {
                required: current_price,
                available: capital,
            });
        }

        let distance = self.stop_distance(atr, current_price);
        if distance <= Decimal::ZERO {
            return Err(EngineError::invalid_risk("stop distance is zero"));
        }

        let sign = direction.sign();
        let stop_loss = current_price - sign * distance;
        let take_profit = current_price + sign * self.config.reward_risk_ratio * distance;
        if stop_loss <= Decimal::ZERO || take_profit <= Decimal::ZERO {
            return Err(EngineError::invalid_risk(format!(
                "levels not positive: stop {stop_loss}, target {take_profit}"
            )));
        }

        let risk_amount = capital * self.config.risk_per_trade;
        let size = risk_amount
            .checked_div(distance)
            .ok_or_else(|| EngineError::invalid_risk("size overflows"))?
            .round_dp_with_strategy(self.config.size_decimals, RoundingStrategy::ToZero);
        if size <= Decimal::ZERO {
            return Err(EngineError::invalid_risk(format!(
                "size rounds to zero (risk {risk_amount}, distance {distance})"
            )));
        }

        let notional = size * current_price;
        let max_notional = capital * self.config.max_leverage;
        if notional > max_notional {
            return Err(EngineError::InsufficientCapital {
                required: notional,
                available: max_notional,
            });
        }

        debug!(
            %direction,
            %size,
            %stop_loss,
            %take_profit,
            %risk_amount,
            "Sized position"
        );

        Ok(SizingDecision {
            direction,
            size,
            stop_loss,
            take_profit,
            reference_price: current_price,
            risk_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daytrade_core::types::SignalDirection;

    fn sizer() -> RiskSizer {
        RiskSizer::new(RiskConfig::default())
    }

    #[test]
    fn test_risk_based_long() {
        let account = Account::new(dec!(10000));
        let signal = Signal::long(0, "test");

        // 2 * 2.5 = 5 below entry; risk 1% = $100 -> 20 units
        let decision = sizer()
            .size_position(&signal, &account, dec!(2.5), dec!(100))
            .unwrap();
        assert_eq!(decision.stop_loss, dec!(95));
        assert_eq!(decision.take_profit, dec!(110));
        assert_eq!(decision.size, dec!(20));
        assert_eq!(decision.risk_amount, dec!(100));
        assert_eq!(decision.notional(), dec!(2000));
    }

    #[test]
    fn test_risk_based_short() {
        let decision = sizer()
            .size_for(Direction::Short, dec!(10000), dec!(2.5), dec!(100))
            .unwrap();
        assert_eq!(decision.stop_loss, dec!(105));
        assert_eq!(decision.take_profit, dec!(90));
        assert_eq!(decision.size, dec!(20));
    }

    #[test]
    fn test_zero_atr_is_invalid_risk() {
        let err = sizer()
            .size_for(Direction::Long, dec!(10000), Decimal::ZERO, dec!(100))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRisk { .. }));
    }

    #[test]
    fn test_min_stop_fraction_covers_zero_atr() {
        let sizer = RiskSizer::new(RiskConfig {
            min_stop_fraction: dec!(0.01),
            ..Default::default()
        });
        let decision = sizer
            .size_for(Direction::Long, dec!(10000), Decimal::ZERO, dec!(100))
            .unwrap();
        assert_eq!(decision.stop_loss, dec!(99));
        assert_eq!(decision.size, dec!(100));
    }

    #[test]
    fn test_leverage_cap() {
        // distance 0.5 -> size 200 -> notional 20000 > 10000
        let err = sizer()
            .size_for(Direction::Long, dec!(10000), dec!(0.25), dec!(100))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::InsufficientCapital {
                required: dec!(20000),
                available: dec!(10000),
            }
        );

        let levered = RiskSizer::new(RiskConfig {
            max_leverage: dec!(2),
            ..Default::default()
        });
        assert!(levered
            .size_for(Direction::Long, dec!(10000), dec!(0.25), dec!(100))
            .is_ok());
    }

    #[test]
    fn test_no_capital() {
        let err = sizer()
            .size_for(Direction::Long, Decimal::ZERO, dec!(2.5), dec!(100))
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientCapital { .. }));
    }

    #[test]
    fn test_size_floored_to_configured_decimals() {
        let sizer = RiskSizer::new(RiskConfig {
            size_decimals: 2,
            ..Default::default()
        });
        // 100 / 3 = 33.333.. -> 33.33
        let decision = sizer
            .size_for(Direction::Long, dec!(10000), dec!(1.5), dec!(100))
            .unwrap();
        assert_eq!(decision.size, dec!(33.33));

        let whole = RiskSizer::new(RiskConfig {
            size_decimals: 0,
            ..Default::default()
        });
        // 1 / 5 = 0.2 -> 0
        let err = whole
            .size_for(Direction::Long, dec!(100), dec!(2.5), dec!(100))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRisk { .. }));
    }

    #[test]
    fn test_exit_signal_cannot_be_sized() {
        let account = Account::new(dec!(10000));
        let signal = Signal::new(0, SignalDirection::ExitLong, "exit");
        assert!(sizer()
            .size_position(&signal, &account, dec!(2.5), dec!(100))
            .is_err());
    }

    #[test]
    fn test_long_stop_below_zero_rejected() {
        let err = sizer()
            .size_for(Direction::Long, dec!(10000), dec!(60), dec!(100))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRisk { .. }));
    }

    #[test]
    fn test_config_validation() {
        assert!(RiskConfig::default().validate().is_ok());

        let config = RiskConfig {
            risk_per_trade: dec!(1.5),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "risk_per_trade",
                ..
            })
        ));

        let config = RiskConfig {
            atr_multiplier_stop: Decimal::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
