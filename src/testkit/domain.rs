//! Builders for domain primitives used across tests.
//!
//! Room drafts default to a two-hour window starting at `now`, a capacity of
//! ten and a minimum stake of one.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::domain::{Amount, MarketKind, NewRoom, Price, UserId};

/// An open fixed-price draft on `symbol`.
pub fn fixed_price_room(symbol: &str, target: Price, now: DateTime<Utc>) -> NewRoom {
    draft(
        MarketKind::FixedPrice {
            symbol: symbol.to_string(),
        },
        target,
        now,
    )
}

/// An open market-cap draft on `token_ref`.
pub fn market_cap_room(token_ref: &str, target: Price, now: DateTime<Utc>) -> NewRoom {
    draft(
        MarketKind::MarketCap {
            token_ref: token_ref.to_string(),
        },
        target,
        now,
    )
}

/// An open custom draft.
pub fn custom_room(now: DateTime<Utc>) -> NewRoom {
    draft(MarketKind::Custom, Decimal::ONE, now)
}

/// Locks in one hour, settles in two.
pub fn draft(market: MarketKind, target: Price, now: DateTime<Utc>) -> NewRoom {
    NewRoom {
        title: format!("{} room", market.label()),
        market,
        target,
        lock_at: now + Duration::hours(1),
        settle_at: now + Duration::hours(2),
        capacity: 10,
        min_bet: Decimal::ONE,
        max_bet: None,
        creator: None,
        queued: false,
    }
}

/// Builder-style adjustments on drafts.
pub trait NewRoomExt {
    #[must_use]
    fn queued(self) -> Self;
    #[must_use]
    fn capacity(self, capacity: u32) -> Self;
    #[must_use]
    fn limits(self, min_bet: Amount, max_bet: Option<Amount>) -> Self;
    #[must_use]
    fn creator(self, creator: &UserId) -> Self;
}

impl NewRoomExt for NewRoom {
    fn queued(mut self) -> Self {
        self.queued = true;
        self
    }

    fn capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    fn limits(mut self, min_bet: Amount, max_bet: Option<Amount>) -> Self {
        self.min_bet = min_bet;
        self.max_bet = max_bet;
        self
    }

    fn creator(mut self, creator: &UserId) -> Self {
        self.creator = Some(creator.clone());
        self
    }
}

/// A moment after the draft's settle time.
pub fn after_settle(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(2) + Duration::seconds(1)
}

/// A moment after the draft's lock time but before settlement.
pub fn after_lock(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(1) + Duration::seconds(1)
}
