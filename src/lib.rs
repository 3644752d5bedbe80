//! Pitboss - settlement engine for peer-to-peer YES/NO prediction rooms.
//!
//! Players stake into a shared pool on one side of a question ("will SOL
//! trade above 200 by Friday?"). When the room settles, the winning side
//! splits the pool pro rata after protocol, host and referral fees.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Pure model: rooms, bets, pools, payout math, state rules
//! - [`port`] - Traits for stores, price oracles, chat platforms, custody
//!   and notifiers
//! - [`application`] - Room lifecycle, oracle resolution, the settlement
//!   scheduler, chat pool coordination and wallets
//! - [`adapter`] - SQLite stores, HTTP price feeds, Telegram, the CLI
//! - [`infrastructure`] - Configuration, wiring and process lifecycle
//!
//! # Settlement
//!
//! Rooms move `QUEUING → OPEN → LOCKED → SETTLED`. Two loops drive them:
//! a deadline sweep that locks and settles rooms whose times have passed,
//! and an instant-target sweep that settles threshold rooms as YES once the
//! observed value reaches the target. Every settlement is applied in a
//! single database transaction conditional on the room still being locked,
//! so concurrent attempts settle a room at most once.
//!
//! # Features
//!
//! - `telegram` (default) - Telegram notifier, chat provider and bot
//! - `testkit` - In-memory fakes and fixtures for integration tests
//!
//! # Example
//!
//! ```no_run
//! use pitboss::infrastructure::bootstrap::build_app;
//! use pitboss::infrastructure::config::settings::Config;
//!
//! # async fn demo() -> pitboss::error::Result<()> {
//! let config = Config::load("pitboss.toml")?;
//! let app = build_app(&config)?;
//! let open = app.rooms.list_rooms(None, 0, 20).await?;
//! println!("{} rooms", open.total);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
