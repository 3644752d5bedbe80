//! Domain errors for room admission, lifecycle transitions and settlement.
//!
//! Admission errors are returned before any state is mutated, so callers can
//! surface them to the user directly. Invariant violations are never
//! expected in a healthy system; when one is detected the affected room is
//! left untouched for an operator to inspect.
//!
//! # Examples
//!
//! ```
//! use pitboss::domain::error::DomainError;
//! use rust_decimal_macros::dec;
//!
//! let err = DomainError::BetTooSmall { min: dec!(0.1) };
//! assert_eq!(err.to_string(), "minimum bet is 0.1");
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use super::room::RoomStatus;

/// Errors that occur when domain rules or invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The room is not accepting bets.
    #[error("room is not open for betting")]
    RoomNotOpen,

    /// The room is not accepting queue entries.
    #[error("room is not queuing")]
    RoomNotQueuing,

    /// The room has reached its participant capacity.
    #[error("room is full")]
    RoomFull,

    /// The wager is below the room's minimum bet.
    #[error("minimum bet is {min}")]
    BetTooSmall {
        /// The room's minimum bet.
        min: Decimal,
    },

    /// The wager is above the room's maximum bet.
    #[error("maximum bet is {max}")]
    BetTooLarge {
        /// The room's maximum bet.
        max: Decimal,
    },

    /// The user's balance cannot cover the amount.
    #[error("insufficient balance")]
    InsufficientBalance,

    /// The user already holds a bet in this room.
    #[error("you already have an active bet in this room")]
    DuplicateBet,

    /// The amount is not positive or has more precision than the ledger holds.
    #[error("invalid amount {amount}")]
    InvalidAmount {
        /// The rejected amount.
        amount: Decimal,
    },

    /// A room status change that would move backwards or skip a stage.
    #[error("cannot move room from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: RoomStatus,
        /// Requested status.
        to: RoomStatus,
    },

    /// Settlement requires the room to be locked first.
    #[error("room must be locked before settlement")]
    RoomNotLocked,

    /// Pool totals disagree with each other or with the room's bets.
    #[error("pool mismatch in room: total {total}, yes {yes}, no {no}, bets {bets}")]
    PoolMismatch {
        /// Recorded total pool.
        total: Decimal,
        /// Recorded YES pool.
        yes: Decimal,
        /// Recorded NO pool.
        no: Decimal,
        /// Sum of bet amounts.
        bets: Decimal,
    },

    /// No free channel is left in the chat pool.
    #[error("no free chats available in pool")]
    PoolExhausted,

    /// The room definition is invalid.
    #[error("invalid room: {0}")]
    InvalidRoom(String),

    /// Unknown market kind or missing market reference.
    #[error("invalid market: {0}")]
    InvalidMarket(String),

    /// Room lookup failed.
    #[error("room not found")]
    RoomNotFound,

    /// User lookup failed.
    #[error("user not found")]
    UserNotFound,
}

impl DomainError {
    /// Whether this error is a wager admission failure that leaves no trace.
    #[must_use]
    pub fn is_admission(&self) -> bool {
        matches!(
            self,
            Self::RoomNotOpen
                | Self::RoomNotQueuing
                | Self::RoomFull
                | Self::BetTooSmall { .. }
                | Self::BetTooLarge { .. }
                | Self::InsufficientBalance
                | Self::DuplicateBet
                | Self::InvalidAmount { .. }
        )
    }

    /// Whether this error signals corrupted state needing an operator.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::PoolMismatch { .. })
    }
}
