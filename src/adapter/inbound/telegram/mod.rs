//! Telegram bot commands: private-chat betting flow and gated room chats.

pub mod command;
pub mod handler;
#[cfg(feature = "telegram")]
pub mod listener;

pub use handler::{CommandHandler, IncomingMessage};
