//! Telegram notifier.
//!
//! Events are queued on an unbounded channel and delivered by a background
//! worker, so [`Notifier::notify`] never waits on the network. Send failures
//! are logged and dropped.
//!
//! Requires the `telegram` feature to be enabled.

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::format::outgoing_messages;
use crate::port::outbound::notifier::{Event, Notifier};

/// Configuration for the Telegram adapters.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API token obtained from BotFather.
    pub bot_token: String,
    /// Chat receiving operator alerts.
    pub admin_chat_id: Option<i64>,
}

impl TelegramConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads `TELEGRAM_BOT_TOKEN` and optionally `PITBOSS_ADMIN_CHAT_ID`.
    /// Returns `None` without a token.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())?;
        let admin_chat_id = std::env::var("PITBOSS_ADMIN_CHAT_ID")
            .ok()
            .and_then(|s| s.trim().parse().ok());
        Some(Self {
            bot_token,
            admin_chat_id,
        })
    }
}

/// Telegram notifier that forwards events to room, participant and admin
/// chats.
pub struct TelegramNotifier {
    sender: mpsc::UnboundedSender<Event>,
}

impl TelegramNotifier {
    /// Create the notifier and spawn its delivery worker.
    #[must_use]
    pub fn new(bot: Bot, config: &TelegramConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(telegram_worker(bot, config.admin_chat_id, receiver));
        Self { sender }
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, event: Event) {
        if self.sender.send(event).is_err() {
            warn!("Telegram notifier channel closed");
        }
    }
}

async fn telegram_worker(
    bot: Bot,
    admin_chat: Option<i64>,
    mut receiver: mpsc::UnboundedReceiver<Event>,
) {
    info!(admin_chat = ?admin_chat, "Telegram notifier started");

    while let Some(event) = receiver.recv().await {
        for message in outgoing_messages(&event, admin_chat) {
            match bot
                .send_message(ChatId(message.chat_id), &message.text)
                .parse_mode(ParseMode::MarkdownV2)
                .await
            {
                Ok(_) => debug!(chat_id = message.chat_id, "Telegram message sent"),
                Err(e) => error!(
                    chat_id = message.chat_id,
                    error = %e,
                    "Failed to send Telegram message"
                ),
            }
        }
    }

    warn!("Telegram notifier worker shutting down");
}
