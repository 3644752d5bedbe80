//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`fakes`] - In-memory port implementations: `StaticOracle`,
//!   `RecordingChannel`, `RecordingNotifier`, `MemoryCustody`,
//!   `MemorySessionStore`.
//! - [`domain`] - Builders for rooms and users.
//! - [`app`] - A fully wired [`App`](crate::infrastructure::bootstrap::App)
//!   over an in-memory database and the fakes above.

pub mod app;
pub mod domain;
pub mod fakes;
