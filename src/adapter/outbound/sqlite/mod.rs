//! SQLite persistence adapters.
//!
//! Provides SQLite-backed implementations of the room, ledger, chat pool and
//! session stores using Diesel ORM.

pub mod chat_store;
pub mod database;
pub mod ledger_store;
pub mod room_store;
pub mod session_store;

pub use chat_store::SqliteChatPoolStore;
pub use database::connection::{create_pool, run_migrations, DbPool};
pub use ledger_store::SqliteLedgerStore;
pub use room_store::SqliteRoomStore;
pub use session_store::SqliteSessionStore;
