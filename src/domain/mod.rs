//! Storage- and transport-agnostic domain model.
//!
//! Everything in here is pure: no I/O, no clocks other than the `now`
//! arguments callers pass in.

pub mod bet;
pub mod chat;
pub mod error;
pub mod id;
pub mod market;
pub mod money;
pub mod resolution;
pub mod room;
pub mod settlement;
pub mod side;
pub mod transaction;
pub mod user;

pub use bet::{Bet, BetFilter, BetStatus, BetTotals, PlayerBet};
pub use chat::{AccessPolicy, ChatPoolEntry, ChatSlotStatus};
pub use error::DomainError;
pub use id::{BetId, ChatRef, ChatSlotId, RoomId, TransactionId, UserId};
pub use market::MarketKind;
pub use money::{Amount, Price};
pub use resolution::Resolution;
pub use room::{NewRoom, Pools, Room, RoomStatus, WagerStage};
pub use settlement::{BetPayout, FeeSchedule, SettlementPlan};
pub use side::Side;
pub use transaction::{LedgerEntry, TransactionKind};
pub use user::{ReferralStats, User};
