//! Outbound adapters (driven side).

pub mod custody;
pub mod oracle;
pub mod sqlite;
#[cfg(feature = "telegram")]
pub mod telegram;
