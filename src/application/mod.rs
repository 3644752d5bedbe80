//! Application services (use cases).
//!
//! These services orchestrate domain logic and coordinate adapters
//! to implement the application's use cases.

pub mod chat;
pub mod oracle;
pub mod room;
pub mod settlement;
pub mod wallet;

pub use chat::{ChatCoordinator, Cooldown, Gate};
pub use oracle::{OracleResolver, OracleSettings};
pub use room::{RoomDetails, RoomService};
pub use settlement::{
    DeadlineLoop, DeadlinePass, InstantTargetLoop, SchedulerConfig, SchedulerHandle,
    SettlementScheduler, Settler,
};
pub use wallet::{WalletService, Winnings};
