use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::Position;

/// One settlement round.
///
/// Rounds chain on a fixed schedule: a round locks `interval` seconds after
/// it starts and ends `interval` seconds after it locks, at which point the
/// next round locks and the one after starts. `open_price` is stamped when
/// the round locks, `close_price` when it resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub start_time: u64,
    pub lock_time: u64,
    pub end_time: u64,
    pub open_price: Option<Decimal>,
    pub close_price: Option<Decimal>,
    pub total_amount: u64,
    pub reward_amount: u64,
    pub up_amount: u64,
    pub down_amount: u64,
    pub is_genesis: bool,
}

/// A single account's stake in one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub amount: u64,
    pub position: Position,
    pub claimed: bool,
}

impl Round {
    /// A fresh round starting at `start`.
    pub fn new(start: u64, interval: u64) -> Self {
        Self {
            start_time: start,
            lock_time: start + interval,
            end_time: start + 2 * interval,
            open_price: None,
            close_price: None,
            total_amount: 0,
            reward_amount: 0,
            up_amount: 0,
            down_amount: 0,
            is_genesis: false,
        }
    }

    /// The pre-dated genesis round: already past its start, locking now.
    pub fn genesis(now: u64, interval: u64) -> Self {
        Self {
            is_genesis: true,
            ..Self::new(now - interval, interval)
        }
    }

    /// Accepting stakes: within the open window of a non-genesis round that
    /// has not been locked in by an execution yet.
    pub fn bettable(&self, now: u64) -> bool {
        !self.is_genesis
            && now >= self.start_time
            && now <= self.lock_time
            && self.open_price.is_none()
    }

    /// Ready to be resolved by the operator.
    pub fn executable(&self, now: u64) -> bool {
        now >= self.end_time
            && (self.is_genesis || self.open_price.is_some())
            && self.close_price.is_none()
    }

    /// Unresolved past its grace window; can never be executed anymore.
    pub fn expired(&self, now: u64, grace_interval: u64) -> bool {
        now > self.end_time + grace_interval && self.close_price.is_none()
    }

    /// Neither side has opposition, so no outcome can redistribute stakes.
    pub fn one_sided(&self) -> bool {
        self.up_amount == 0 || self.down_amount == 0
    }

    /// Resolved with a real winner: ended, both prices set, prices moved and
    /// both sides carried stake. One-sided rounds are never claimable even
    /// when resolved; they fall through to the refund path.
    pub fn claimable(&self, now: u64) -> bool {
        now >= self.end_time
            && self.open_price.is_some()
            && self.close_price.is_some()
            && self.open_price != self.close_price
            && !self.one_sided()
    }

    /// Voided: a push, an abandoned round past grace, or a one-sided round
    /// past its lock. Stakes come back as-is.
    pub fn refundable(&self, now: u64, grace_interval: u64) -> bool {
        (now >= self.end_time
            && self.open_price.is_some()
            && self.close_price.is_some()
            && self.open_price == self.close_price)
            || (self.close_price.is_none() && now > self.end_time + grace_interval)
            || (now > self.lock_time && self.one_sided())
    }

    pub fn winner(&self) -> Option<Position> {
        match (self.open_price, self.close_price) {
            (Some(open), Some(close)) if close > open => Some(Position::Up),
            (Some(open), Some(close)) if close < open => Some(Position::Down),
            _ => None,
        }
    }

    /// Record the close price and split the pool into fee + reward.
    ///
    /// Voided rounds (push, one-sided, or no open price) take no fee and pay
    /// no reward. Otherwise the fee is `total × fee_rate`, rounded half-up
    /// and capped by the losing pool, so the winning side can never receive
    /// less than its own stake back. Returns the fee taken.
    pub fn settle(&mut self, close_price: Decimal, fee_rate: Decimal) -> u64 {
        self.close_price = Some(close_price);

        let winner = match self.winner() {
            Some(w) => w,
            None => return 0,
        };
        if self.one_sided() {
            return 0;
        }

        let losing_amount = match winner {
            Position::Up => self.down_amount,
            Position::Down => self.up_amount,
        };

        let gross = (Decimal::from(self.total_amount) * fee_rate)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_u64()
            .unwrap_or(u64::MAX);
        let fee = gross.min(losing_amount);

        self.reward_amount = self.total_amount - fee;
        fee
    }

    /// What a given bet is worth right now: the proportional reward share on
    /// a claimable round, the raw stake on a refundable one, zero otherwise.
    pub fn claimable_amount(&self, now: u64, bet: &Bet, grace_interval: u64) -> u64 {
        if self.claimable(now) {
            let win_amount = match self.winner() {
                Some(w) if w == bet.position => match w {
                    Position::Up => self.up_amount,
                    Position::Down => self.down_amount,
                },
                _ => 0,
            };
            if win_amount == 0 {
                0
            } else {
                ((bet.amount as u128 * self.reward_amount as u128) / win_amount as u128) as u64
            }
        } else if self.refundable(now, grace_interval) {
            bet.amount
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const INTERVAL: u64 = 18000;
    const GRACE: u64 = 18000;

    fn open_round() -> Round {
        let mut round = Round::new(10_000, INTERVAL);
        round.open_price = Some(dec!(3));
        round
    }

    fn stake(round: &mut Round, position: Position, amount: u64) {
        round.total_amount += amount;
        match position {
            Position::Up => round.up_amount += amount,
            Position::Down => round.down_amount += amount,
        }
    }

    #[test]
    fn test_round_schedule() {
        let round = Round::new(10_000, INTERVAL);
        assert_eq!(round.lock_time, 28_000);
        assert_eq!(round.end_time, 46_000);
        assert!(!round.is_genesis);
    }

    #[test]
    fn test_genesis_round_is_predated() {
        let round = Round::genesis(100_000, INTERVAL);
        assert_eq!(round.start_time, 82_000);
        assert_eq!(round.lock_time, 100_000);
        assert_eq!(round.end_time, 118_000);
        assert!(round.is_genesis);
        // genesis never takes bets, even inside its window
        assert!(!round.bettable(100_000 - 1));
    }

    #[test]
    fn test_bettable_window() {
        let round = Round::new(10_000, INTERVAL);
        assert!(!round.bettable(9_999));
        assert!(round.bettable(10_000));
        assert!(round.bettable(28_000));
        assert!(!round.bettable(28_001));
    }

    #[test]
    fn test_locked_round_not_bettable() {
        let round = open_round();
        assert!(!round.bettable(20_000));
    }

    #[test]
    fn test_executable_and_expired() {
        let round = open_round();
        assert!(!round.executable(45_999));
        assert!(round.executable(46_000));
        assert!(round.executable(46_000 + GRACE));
        assert!(!round.expired(46_000 + GRACE, GRACE));
        assert!(round.expired(46_000 + GRACE + 1, GRACE));

        let mut resolved = round.clone();
        resolved.close_price = Some(dec!(4));
        assert!(!resolved.executable(50_000));
        assert!(!resolved.expired(u64::MAX, GRACE));
    }

    #[test]
    fn test_settle_fee_and_reward() {
        let mut round = open_round();
        stake(&mut round, Position::Up, 1000);
        stake(&mut round, Position::Down, 600);

        let fee = round.settle(dec!(4), dec!(0.03));
        assert_eq!(fee, 48);
        assert_eq!(round.reward_amount, 1552);
        assert_eq!(round.winner(), Some(Position::Up));
    }

    #[test]
    fn test_settle_fee_capped_by_losing_side() {
        let mut round = open_round();
        stake(&mut round, Position::Up, 1000);
        stake(&mut round, Position::Down, 20);

        // 3% of 1020 would be 30.6; the losers only put up 20
        let fee = round.settle(dec!(6), dec!(0.03));
        assert_eq!(fee, 20);
        assert_eq!(round.reward_amount, 1000);
    }

    #[test]
    fn test_settle_fee_rounds_half_up() {
        let mut round = open_round();
        stake(&mut round, Position::Up, 500);
        stake(&mut round, Position::Down, 350);

        // 850 * 0.03 = 25.5 -> 26
        let fee = round.settle(dec!(4), dec!(0.03));
        assert_eq!(fee, 26);
        assert_eq!(round.reward_amount, 824);
    }

    #[test]
    fn test_settle_push_is_voided() {
        let mut round = open_round();
        stake(&mut round, Position::Up, 1000);
        stake(&mut round, Position::Down, 20);

        let fee = round.settle(dec!(3), dec!(0.03));
        assert_eq!(fee, 0);
        assert_eq!(round.reward_amount, 0);
        assert_eq!(round.winner(), None);
    }

    #[test]
    fn test_settle_one_sided_is_voided() {
        let mut round = open_round();
        stake(&mut round, Position::Down, 500);

        let fee = round.settle(dec!(2), dec!(0.03));
        assert_eq!(fee, 0);
        assert_eq!(round.reward_amount, 0);
    }

    #[test]
    fn test_winner_payout_is_floored_share() {
        let mut round = open_round();
        stake(&mut round, Position::Up, 1000);
        stake(&mut round, Position::Down, 500);
        round.settle(dec!(2), dec!(0.03)); // down wins, fee 45, reward 1455

        let bet = Bet {
            amount: 100,
            position: Position::Down,
            claimed: false,
        };
        assert_eq!(round.claimable_amount(round.end_time, &bet, GRACE), 291);
    }

    #[test]
    fn test_loser_claims_nothing() {
        let mut round = open_round();
        stake(&mut round, Position::Up, 1000);
        stake(&mut round, Position::Down, 500);
        round.settle(dec!(2), dec!(0.03));

        let bet = Bet {
            amount: 1000,
            position: Position::Up,
            claimed: false,
        };
        assert_eq!(round.claimable_amount(round.end_time, &bet, GRACE), 0);
    }

    #[test]
    fn test_push_refunds_exact_stake() {
        let mut round = open_round();
        stake(&mut round, Position::Up, 1000);
        stake(&mut round, Position::Down, 500);
        round.settle(dec!(3), dec!(0.03));

        let bet = Bet {
            amount: 500,
            position: Position::Down,
            claimed: false,
        };
        assert!(round.refundable(round.end_time, GRACE));
        assert_eq!(round.claimable_amount(round.end_time, &bet, GRACE), 500);
    }

    #[test]
    fn test_abandoned_round_refunds_after_grace() {
        let mut round = open_round();
        stake(&mut round, Position::Up, 1000);
        stake(&mut round, Position::Down, 500);

        let bet = Bet {
            amount: 1000,
            position: Position::Up,
            claimed: false,
        };
        // still inside grace: nothing yet
        assert_eq!(
            round.claimable_amount(round.end_time + GRACE, &bet, GRACE),
            0
        );
        assert_eq!(
            round.claimable_amount(round.end_time + GRACE + 1, &bet, GRACE),
            1000
        );
    }

    #[test]
    fn test_one_sided_refunds_right_after_lock() {
        let mut round = Round::new(10_000, INTERVAL);
        stake(&mut round, Position::Down, 500);

        let bet = Bet {
            amount: 500,
            position: Position::Down,
            claimed: false,
        };
        assert_eq!(round.claimable_amount(round.lock_time, &bet, GRACE), 0);
        assert_eq!(round.claimable_amount(round.lock_time + 1, &bet, GRACE), 500);
    }

    #[test]
    fn test_one_sided_resolved_round_still_refunds() {
        let mut round = open_round();
        stake(&mut round, Position::Up, 1000);
        round.settle(dec!(9), dec!(0.03)); // up "won", but nobody opposed

        let bet = Bet {
            amount: 1000,
            position: Position::Up,
            claimed: false,
        };
        assert!(!round.claimable(round.end_time));
        assert_eq!(round.claimable_amount(round.end_time, &bet, GRACE), 1000);
    }
}
