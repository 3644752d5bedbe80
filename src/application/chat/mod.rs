//! Channel pool coordination and the room-chat access gate.

pub mod coordinator;
pub mod cooldown;

pub use coordinator::{ChatCoordinator, Gate, PLEASE_WAIT_MESSAGE, REFUSAL_MESSAGE, WAGER_COMMAND};
pub use cooldown::Cooldown;
