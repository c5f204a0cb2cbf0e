//! Owner of the single open position.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::simulator::ExecutionSimulator;
use daytrade_core::error::EngineError;
use daytrade_core::types::{ExitReason, Position, PreciseBar, Signal, Trade};
use daytrade_risk::{SizingDecision, TrailingStopRule};

/// Which level wins when one bar touches both stop and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameBarPolicy {
    /// Assume the stop was hit first
    #[default]
    StopFirst,
    /// Assume the target was hit first
    TargetFirst,
}

/// Drives the `Pending -> Open -> Closed` lifecycle, one position at a time.
///
/// Each open bar is evaluated in a fixed order: stop, target, then signal
/// exit. A surviving position then has its trailing stop ratcheted from the
/// bar's close, effective from the following bar. At most one exit happens
/// per bar.
#[derive(Debug, Clone, Default)]
pub struct PositionManager {
    position: Option<Position>,
    next_id: u64,
    trailing: TrailingStopRule,
    same_bar_policy: SameBarPolicy,
}

impl PositionManager {
    pub fn new(trailing: TrailingStopRule, same_bar_policy: SameBarPolicy) -> Self {
        Self {
            position: None,
            next_id: 1,
            trailing,
            same_bar_policy,
        }
    }

    /// The open position, if any.
    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn has_open_position(&self) -> bool {
        self.position.is_some()
    }

    /// Open a position from a sizing decision.
    ///
    /// Nothing changes if the fill is refused.
    pub fn open(
        &mut self,
        exec: &mut ExecutionSimulator,
        decision: &SizingDecision,
        open_time: i64,
        desired_price: Decimal,
        book_liquidity: Decimal,
    ) -> Result<&Position, EngineError> {
        if self.position.is_some() {
            return Err(EngineError::PositionAlreadyOpen);
        }

        let mut position = Position::pending(
            self.next_id,
            decision.direction,
            decision.size,
            decision.stop_loss,
            decision.take_profit,
            open_time,
        );
        let fill = exec.open(&mut position, desired_price, book_liquidity)?;
        self.next_id += 1;

        info!(
            id = position.id,
            direction = %position.direction,
            price = %fill.price,
            size = %fill.quantity,
            stop = %position.stop_loss,
            target = %position.take_profit,
            "Opened position"
        );

        Ok(&*self.position.insert(position))
    }

    /// Step the open position through one bar.
    ///
    /// Returns the finished trade when the position closed on this bar.
    pub fn update(
        &mut self,
        exec: &mut ExecutionSimulator,
        bar: &PreciseBar,
        atr: Option<Decimal>,
        signal: Option<&Signal>,
    ) -> Result<Option<Trade>, EngineError> {
        let trailing = self.trailing;
        let policy = self.same_bar_policy;
        let Some(position) = self.position.as_mut() else {
            return Ok(None);
        };

        let stop_reason = if position.trailing_stop.is_some() {
            ExitReason::TrailingStop
        } else {
            ExitReason::StopLoss
        };
        let stop_hit = position.stop_breached(bar.low, bar.high);
        let target_hit = position.target_reached(bar.low, bar.high);

        let exit = match (stop_hit, target_hit) {
            (true, true) if policy == SameBarPolicy::TargetFirst => {
                Some((position.take_profit, ExitReason::TakeProfit))
            }
            (true, _) => Some((position.stop_loss, stop_reason)),
            (false, true) => Some((position.take_profit, ExitReason::TakeProfit)),
            (false, false) => signal
                .filter(|s| s.direction.closes(position.direction))
                .map(|_| (bar.close, ExitReason::Signal)),
        };

        if let Some((price, reason)) = exit {
            return self.close_at(exec, price, bar.timestamp, reason);
        }

        // The close is only known once the bar is over, so a level built
        // from it is first tested against the next bar's range.
        if trailing.apply(position, bar.close, atr) {
            debug!(id = position.id, stop = %position.stop_loss, "Trailing stop moved");
        }
        Ok(None)
    }

    /// Close the open position at `price`. Returns None when flat.
    pub fn close_at(
        &mut self,
        exec: &mut ExecutionSimulator,
        price: Decimal,
        timestamp: i64,
        reason: ExitReason,
    ) -> Result<Option<Trade>, EngineError> {
        let Some(position) = self.position.as_mut() else {
            return Ok(None);
        };

        let fill = exec.close(position, price)?;
        let trade = position.close(&fill, timestamp, reason)?;
        self.position = None;

        info!(
            id = trade.id,
            direction = %trade.direction,
            exit_price = %trade.exit_price,
            pnl = %trade.pnl,
            reason = %trade.exit_reason,
            "Closed position"
        );

        Ok(Some(trade))
    }

    /// Mark-to-market value of the open position, zero when flat.
    pub fn unrealized_pnl(&self, mark: Decimal) -> Decimal {
        self.position
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.unrealized_pnl(mark))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::ExecutionConfig;
    use daytrade_core::types::{Direction, SignalDirection};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn frictionless() -> ExecutionSimulator {
        ExecutionSimulator::new(ExecutionConfig {
            fee_rate: Decimal::ZERO,
            flat_fee: Decimal::ZERO,
            slippage_rate: Decimal::ZERO,
            max_liquidity_fraction: Decimal::ONE,
        })
    }

    fn decision(direction: Direction) -> SizingDecision {
        let (stop_loss, take_profit) = match direction {
            Direction::Long => (dec!(95), dec!(110)),
            Direction::Short => (dec!(105), dec!(90)),
        };
        SizingDecision {
            direction,
            size: dec!(20),
            stop_loss,
            take_profit,
            reference_price: dec!(100),
            risk_amount: dec!(100),
        }
    }

    fn bar(ts: i64, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> PreciseBar {
        PreciseBar {
            timestamp: ts,
            open,
            high,
            low,
            close,
            volume: dec!(100000),
        }
    }

    fn opened(
        direction: Direction,
        trailing: TrailingStopRule,
        policy: SameBarPolicy,
    ) -> (PositionManager, ExecutionSimulator) {
        let mut exec = frictionless();
        let mut manager = PositionManager::new(trailing, policy);
        manager
            .open(&mut exec, &decision(direction), 0, dec!(100), dec!(100000))
            .unwrap();
        (manager, exec)
    }

    #[test]
    fn test_take_profit() {
        let (mut manager, mut exec) =
            opened(Direction::Long, TrailingStopRule::Disabled, SameBarPolicy::StopFirst);

        let quiet = bar(1, dec!(100), dec!(104), dec!(98), dec!(102));
        assert!(manager.update(&mut exec, &quiet, None, None).unwrap().is_none());

        let up = bar(2, dec!(102), dec!(111), dec!(101), dec!(108));
        let trade = manager.update(&mut exec, &up, None, None).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert_eq!(trade.exit_price, dec!(110));
        assert_eq!(trade.pnl, dec!(200));
        assert!(!manager.has_open_position());
        assert!(!exec.has_open_position());
    }

    #[test]
    fn test_stop_wins_same_bar_by_default() {
        let (mut manager, mut exec) =
            opened(Direction::Long, TrailingStopRule::Disabled, SameBarPolicy::StopFirst);
        let wide = bar(1, dec!(100), dec!(112), dec!(94), dec!(100));
        let trade = manager.update(&mut exec, &wide, None, None).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_price, dec!(95));
        assert_eq!(trade.pnl, dec!(-100));
    }

    #[test]
    fn test_gap_through_stop_exits_at_level() {
        let (mut manager, mut exec) =
            opened(Direction::Long, TrailingStopRule::Disabled, SameBarPolicy::StopFirst);
        let gap_down = bar(1, dec!(90), dec!(91), dec!(88), dec!(89));
        let trade = manager.update(&mut exec, &gap_down, None, None).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit_price, dec!(95));
    }

    #[test]
    fn test_target_first_policy() {
        let (mut manager, mut exec) =
            opened(Direction::Long, TrailingStopRule::Disabled, SameBarPolicy::TargetFirst);
        let wide = bar(1, dec!(100), dec!(112), dec!(94), dec!(100));
        let trade = manager.update(&mut exec, &wide, None, None).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
    }

    #[test]
    fn test_short_levels() {
        let (mut manager, mut exec) =
            opened(Direction::Short, TrailingStopRule::Disabled, SameBarPolicy::StopFirst);
        let down = bar(1, dec!(99), dec!(100), dec!(89), dec!(91));
        let trade = manager.update(&mut exec, &down, None, None).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
        assert_eq!(trade.pnl, dec!(200));
    }

    #[test]
    fn test_signal_exit_at_close() {
        let (mut manager, mut exec) =
            opened(Direction::Long, TrailingStopRule::Disabled, SameBarPolicy::StopFirst);

        // Same-direction signal does nothing
        let same = Signal::long(1, "again");
        let b = bar(1, dec!(100), dec!(102), dec!(99), dec!(101));
        assert!(manager.update(&mut exec, &b, None, Some(&same)).unwrap().is_none());

        let exit = Signal::new(2, SignalDirection::ExitLong, "done");
        let b = bar(2, dec!(101), dec!(104), dec!(100), dec!(103));
        let trade = manager.update(&mut exec, &b, None, Some(&exit)).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::Signal);
        assert_eq!(trade.exit_price, dec!(103));
        assert_eq!(trade.pnl, dec!(60));
    }

    #[test]
    fn test_opposing_signal_exits() {
        let (mut manager, mut exec) =
            opened(Direction::Short, TrailingStopRule::Disabled, SameBarPolicy::StopFirst);
        let flip = Signal::long(1, "reversal");
        let b = bar(1, dec!(100), dec!(101), dec!(97), dec!(98));
        let trade = manager.update(&mut exec, &b, None, Some(&flip)).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::Signal);
        assert_eq!(trade.pnl, dec!(40));
    }

    #[test]
    fn test_trailing_stop_exit_reason() {
        let rule = TrailingStopRule::Fraction { distance: dec!(0.02) };
        let (mut manager, mut exec) = opened(Direction::Long, rule, SameBarPolicy::StopFirst);

        // Close 105: move 5 >= 2.1, stop -> 102.9
        let up = bar(1, dec!(101), dec!(106), dec!(103), dec!(105));
        assert!(manager.update(&mut exec, &up, None, None).unwrap().is_none());
        let position = manager.position().unwrap();
        assert_eq!(position.stop_loss, dec!(102.9));
        assert_eq!(position.trailing_stop, Some(dec!(102.9)));

        let down = bar(2, dec!(104), dec!(104), dec!(102), dec!(102.5));
        let trade = manager.update(&mut exec, &down, None, None).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
        assert_eq!(trade.exit_price, dec!(102.9));
        assert_eq!(trade.pnl, dec!(58));
    }

    #[test]
    fn test_trailing_level_not_tested_against_its_own_bar() {
        let rule = TrailingStopRule::Fraction { distance: dec!(0.02) };
        let (mut manager, mut exec) = opened(Direction::Long, rule, SameBarPolicy::StopFirst);

        // Dips to 97 then closes at 108; the ratchet to 105.84 must not
        // be filled by the earlier low
        let dip_then_rally = bar(1, dec!(100), dec!(109), dec!(97), dec!(108));
        assert!(manager
            .update(&mut exec, &dip_then_rally, None, None)
            .unwrap()
            .is_none());
        let position = manager.position().unwrap();
        assert_eq!(position.stop_loss, dec!(105.84));

        let next = bar(2, dec!(107), dec!(108), dec!(105), dec!(106));
        let trade = manager.update(&mut exec, &next, None, None).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
        assert_eq!(trade.exit_price, dec!(105.84));
    }

    #[test]
    fn test_second_open_refused() {
        let (mut manager, mut exec) =
            opened(Direction::Long, TrailingStopRule::Disabled, SameBarPolicy::StopFirst);
        let err = manager
            .open(&mut exec, &decision(Direction::Short), 1, dec!(100), dec!(100000))
            .unwrap_err();
        assert_eq!(err, EngineError::PositionAlreadyOpen);
        assert_eq!(manager.position().unwrap().direction, Direction::Long);
    }

    #[test]
    fn test_ids_increase_and_close_at() {
        let (mut manager, mut exec) =
            opened(Direction::Long, TrailingStopRule::Disabled, SameBarPolicy::StopFirst);
        let first = manager
            .close_at(&mut exec, dec!(101), 5, ExitReason::EndOfData)
            .unwrap()
            .unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.exit_reason, ExitReason::EndOfData);
        assert!(manager
            .close_at(&mut exec, dec!(101), 6, ExitReason::EndOfData)
            .unwrap()
            .is_none());

        let second = manager
            .open(&mut exec, &decision(Direction::Long), 7, dec!(100), dec!(100000))
            .unwrap();
        assert_eq!(second.id, 2);
    }

    #[test]
    fn test_unrealized_pnl() {
        let (manager, _) = opened(Direction::Long, TrailingStopRule::Disabled, SameBarPolicy::StopFirst);
        assert_eq!(manager.unrealized_pnl(dec!(103)), dec!(60));
        assert_eq!(PositionManager::default().unrealized_pnl(dec!(103)), Decimal::ZERO);
    }

    proptest! {
        #[test]
        fn prop_pnl_identity(
            exit_cents in 9_600u32..10_900,
            fee_bps in 0u32..50,
            slip_bps in 0u32..20,
            long in any::<bool>(),
        ) {
            let direction = if long { Direction::Long } else { Direction::Short };
            let mut exec = ExecutionSimulator::new(ExecutionConfig {
                fee_rate: Decimal::new(fee_bps as i64, 4),
                flat_fee: dec!(0.5),
                slippage_rate: Decimal::new(slip_bps as i64, 4),
                max_liquidity_fraction: Decimal::ONE,
            });
            let mut manager = PositionManager::new(TrailingStopRule::Disabled, SameBarPolicy::StopFirst);
            let decision = SizingDecision {
                direction,
                size: dec!(20),
                stop_loss: if long { dec!(90) } else { dec!(110) },
                take_profit: if long { dec!(120) } else { dec!(80) },
                reference_price: dec!(100),
                risk_amount: dec!(200),
            };
            manager.open(&mut exec, &decision, 0, dec!(100), dec!(100000)).unwrap();

            let exit = Decimal::new(exit_cents as i64, 2);
            let trade = manager
                .close_at(&mut exec, exit, 1, ExitReason::Signal)
                .unwrap()
                .unwrap();

            let expected = (trade.exit_price - trade.entry_price) * trade.size * direction.sign()
                - trade.fees_paid;
            prop_assert_eq!(trade.pnl, expected);
        }
    }
}
