//! Room locking and settlement.

mod deadline;
mod instant;
mod scheduler;
mod settler;

pub use deadline::{DeadlineLoop, DeadlinePass};
pub use instant::InstantTargetLoop;
pub use scheduler::{SchedulerConfig, SchedulerHandle, SettlementScheduler};
pub use settler::Settler;
