//! Prediction rooms and their lifecycle.
//!
//! A room moves strictly forward through `QUEUING → OPEN → LOCKED → SETTLED`.
//! `QUEUING` is optional: rooms created for immediate play start `OPEN`.
//! Admission rules for wagers live here so that every entry point (CLI,
//! chat command, queue) rejects the same inputs in the same order before any
//! state is touched.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::{ChatRef, RoomId, UserId};
use super::market::MarketKind;
use super::money::{ensure_positive, to_atoms, Amount, Price};
use super::side::Side;

/// Lifecycle state of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoomStatus {
    /// Accepting queued stakes ahead of launch.
    Queuing,
    /// Accepting bets.
    Open,
    /// Betting closed, outcome pending.
    Locked,
    /// Terminal. Payouts distributed.
    Settled,
}

impl RoomStatus {
    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queuing => "QUEUING",
            Self::Open => "OPEN",
            Self::Locked => "LOCKED",
            Self::Settled => "SETTLED",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Queuing => 0,
            Self::Open => 1,
            Self::Locked => 2,
            Self::Settled => 3,
        }
    }

    /// Only single forward steps are allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        next.rank() == self.rank() + 1
    }

    /// Whether the room can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Settled)
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QUEUING" => Ok(Self::Queuing),
            "OPEN" => Ok(Self::Open),
            "LOCKED" => Ok(Self::Locked),
            "SETTLED" => Ok(Self::Settled),
            other => Err(format!("unknown room status '{other}'")),
        }
    }
}

/// Aggregate stakes of a room.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pools {
    /// Sum of all stakes.
    pub total: Amount,
    /// Stakes on YES.
    pub yes: Amount,
    /// Stakes on NO.
    pub no: Amount,
}

impl Pools {
    /// Pool for one side.
    #[must_use]
    pub fn side(&self, side: Side) -> Amount {
        match side {
            Side::Yes => self.yes,
            Side::No => self.no,
        }
    }

    /// Add a stake to the total and the side pool.
    pub fn add(&mut self, side: Side, amount: Amount) {
        self.total += amount;
        match side {
            Side::Yes => self.yes += amount,
            Side::No => self.no += amount,
        }
    }

    /// `total == yes + no`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total == self.yes + self.no
    }
}

/// Which entry point a wager arrives through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WagerStage {
    /// Regular bet on an open room.
    Open,
    /// Queued stake on a room that has not launched yet.
    Queue,
}

/// A prediction market instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub title: String,
    pub market: MarketKind,
    pub target: Price,
    pub lock_at: DateTime<Utc>,
    pub settle_at: DateTime<Utc>,
    pub status: RoomStatus,
    pub capacity: u32,
    pub current_players: u32,
    pub min_bet: Amount,
    pub max_bet: Option<Amount>,
    pub pools: Pools,
    pub lock_price: Option<Price>,
    pub settle_price: Option<Price>,
    pub winning_side: Option<Side>,
    pub chat: Option<ChatRef>,
    pub invite_link: Option<String>,
    pub creator: Option<UserId>,
    pub protocol_fee: Amount,
    pub host_fee: Amount,
    pub created_at: DateTime<Utc>,
    pub locked_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Room {
    /// Short label used in channel titles and messages.
    #[must_use]
    pub fn short_id(&self) -> &str {
        let id = self.id.as_str();
        id.get(..8).unwrap_or(id)
    }

    /// Whether the settle deadline has passed.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.settle_at
    }

    /// Whether betting should be closed.
    #[must_use]
    pub fn lock_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.lock_at || self.is_due(now)
    }

    /// Validate a status change.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidTransition`] for backward or skipping moves.
    pub fn ensure_transition(&self, to: RoomStatus) -> Result<(), DomainError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }

    /// Check whether a wager may be placed.
    ///
    /// All preconditions are evaluated before any mutation; the first
    /// violated rule is reported.
    ///
    /// # Errors
    /// Returns the admission error for the first rule that fails.
    pub fn admit(
        &self,
        stage: WagerStage,
        amount: Amount,
        balance: Amount,
        already_in_room: bool,
    ) -> Result<(), DomainError> {
        ensure_positive(amount)?;

        match stage {
            WagerStage::Open if self.status != RoomStatus::Open => {
                return Err(DomainError::RoomNotOpen)
            }
            WagerStage::Queue if self.status != RoomStatus::Queuing => {
                return Err(DomainError::RoomNotQueuing)
            }
            _ => {}
        }

        if self.current_players >= self.capacity {
            return Err(DomainError::RoomFull);
        }
        if amount < self.min_bet {
            return Err(DomainError::BetTooSmall { min: self.min_bet });
        }
        if let Some(max) = self.max_bet {
            if amount > max {
                return Err(DomainError::BetTooLarge { max });
            }
        }
        if balance < amount {
            return Err(DomainError::InsufficientBalance);
        }
        if already_in_room {
            return Err(DomainError::DuplicateBet);
        }
        Ok(())
    }
}

/// Input for creating a room.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRoom {
    pub title: String,
    pub market: MarketKind,
    pub target: Price,
    pub lock_at: DateTime<Utc>,
    pub settle_at: DateTime<Utc>,
    pub capacity: u32,
    pub min_bet: Amount,
    pub max_bet: Option<Amount>,
    pub creator: Option<UserId>,
    /// Start in `QUEUING` instead of `OPEN`.
    pub queued: bool,
}

impl NewRoom {
    /// Validate the room definition.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRoom`] describing the first bad field.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        let invalid = |reason: &str| Err(DomainError::InvalidRoom(reason.to_string()));

        if self.title.trim().is_empty() {
            return invalid("title must not be empty");
        }
        if self.target <= Decimal::ZERO {
            return invalid("target must be positive");
        }
        if self.settle_at <= now {
            return invalid("settle time must be in the future");
        }
        if self.lock_at > self.settle_at {
            return invalid("lock time must not be after settle time");
        }
        if self.capacity < 2 {
            return invalid("capacity must be at least 2");
        }
        if self.min_bet <= Decimal::ZERO || to_atoms(self.min_bet).is_err() {
            return invalid("minimum bet must be a positive amount");
        }
        if let Some(max) = self.max_bet {
            if max < self.min_bet || to_atoms(max).is_err() {
                return invalid("maximum bet must not be below the minimum bet");
            }
        }
        Ok(())
    }

    /// Materialise the room with zero pools.
    #[must_use]
    pub fn into_room(self, now: DateTime<Utc>) -> Room {
        Room {
            id: RoomId::new(),
            title: self.title.trim().to_string(),
            market: self.market,
            target: self.target,
            lock_at: self.lock_at,
            settle_at: self.settle_at,
            status: if self.queued {
                RoomStatus::Queuing
            } else {
                RoomStatus::Open
            },
            capacity: self.capacity,
            current_players: 0,
            min_bet: self.min_bet,
            max_bet: self.max_bet,
            pools: Pools::default(),
            lock_price: None,
            settle_price: None,
            winning_side: None,
            chat: None,
            invite_link: None,
            creator: self.creator,
            protocol_fee: Decimal::ZERO,
            host_fee: Decimal::ZERO,
            created_at: now,
            locked_at: None,
            settled_at: None,
        }
    }
}
