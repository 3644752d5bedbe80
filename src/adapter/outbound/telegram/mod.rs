//! Telegram adapters: notifications and pooled group management.
//!
//! Requires the `telegram` feature to be enabled.

pub mod channel;
pub mod format;
pub mod notifier;

pub use channel::TelegramChannel;
pub use notifier::{TelegramConfig, TelegramNotifier};
