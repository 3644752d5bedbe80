//! Fee and payout computation.
//!
//! A plan is a pure function of the room's closed pools and its bets:
//! `payout = amount / winning_pool × payout_pool`, truncated toward zero to
//! ledger precision so the sum of payouts never exceeds the payout pool.
//! When nobody backed the winning side, every payout is zero and the pool is
//! forfeited.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::bet::Bet;
use super::error::DomainError;
use super::id::{BetId, RoomId, UserId};
use super::money::{truncate, Amount};
use super::room::Room;
use super::side::Side;

/// Fee rates applied at settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Share of the total pool kept by the protocol.
    pub protocol_rate: Decimal,
    /// Share of the total pool owed to the room creator.
    pub host_rate: Decimal,
    /// Share of the protocol fee on a referred winner's payout paid to the referrer.
    pub referral_share: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            protocol_rate: Decimal::new(2, 2),
            host_rate: Decimal::new(1, 2),
            referral_share: Decimal::new(5, 2),
        }
    }
}

impl FeeSchedule {
    /// Fraction of the total pool distributed to winners.
    #[must_use]
    pub fn payout_rate(&self) -> Decimal {
        Decimal::ONE - self.protocol_rate - self.host_rate
    }

    /// Reward owed to the referrer of a winner.
    #[must_use]
    pub fn referral_reward(&self, payout: Amount) -> Amount {
        truncate(payout * self.protocol_rate * self.referral_share)
    }
}

/// Settlement result for one bet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetPayout {
    pub bet_id: BetId,
    pub user_id: UserId,
    pub side: Side,
    pub amount: Amount,
    pub won: bool,
    pub payout: Amount,
}

/// Everything the store needs to settle a room in one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub room_id: RoomId,
    pub winning_side: Side,
    pub total_pool: Amount,
    pub winning_pool: Amount,
    pub protocol_fee: Amount,
    pub host_fee: Amount,
    pub payout_pool: Amount,
    pub fees: FeeSchedule,
    pub payouts: Vec<BetPayout>,
}

impl SettlementPlan {
    /// Compute fees and per-bet payouts.
    ///
    /// # Errors
    /// Returns [`DomainError::PoolMismatch`] if the room's pools disagree with
    /// each other or with the sum of its bets.
    pub fn build(
        room: &Room,
        bets: &[Bet],
        winning_side: Side,
        fees: FeeSchedule,
    ) -> Result<Self, DomainError> {
        let pools = room.pools;
        let staked: Amount = bets.iter().map(|b| b.amount).sum();
        if !pools.is_consistent() || staked != pools.total {
            return Err(DomainError::PoolMismatch {
                total: pools.total,
                yes: pools.yes,
                no: pools.no,
                bets: staked,
            });
        }

        let total = pools.total;
        let winning_pool = pools.side(winning_side);
        let protocol_fee = truncate(total * fees.protocol_rate);
        let host_fee = truncate(total * fees.host_rate);
        let payout_pool = truncate(total * fees.payout_rate());

        let payouts = bets
            .iter()
            .map(|bet| {
                let won = bet.side == winning_side;
                let payout = if won && !winning_pool.is_zero() {
                    truncate(bet.amount * payout_pool / winning_pool)
                } else {
                    Decimal::ZERO
                };
                BetPayout {
                    bet_id: bet.id.clone(),
                    user_id: bet.user_id.clone(),
                    side: bet.side,
                    amount: bet.amount,
                    won,
                    payout,
                }
            })
            .collect();

        Ok(Self {
            room_id: room.id.clone(),
            winning_side,
            total_pool: total,
            winning_pool,
            protocol_fee,
            host_fee,
            payout_pool,
            fees,
            payouts,
        })
    }

    /// Sum of all payouts.
    #[must_use]
    pub fn distributed(&self) -> Amount {
        self.payouts.iter().map(|p| p.payout).sum()
    }

    /// Whether any balance will be credited.
    #[must_use]
    pub fn has_winners(&self) -> bool {
        self.payouts.iter().any(|p| !p.payout.is_zero())
    }
}
