//! Telegram long-polling listener.
//!
//! Requires the `telegram` feature to be enabled.

use std::sync::Arc;

use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::BotCommand as MenuCommand;
use tracing::{error, info, warn};

use super::command::bot_commands;
use super::handler::{CommandHandler, IncomingMessage};
use crate::domain::ChatRef;

/// Serve commands until the process shuts down.
pub async fn listen(bot: Bot, handler: Arc<CommandHandler>) {
    if let Err(e) = register_bot_commands(&bot).await {
        warn!(error = %e, "Failed to register bot commands with Telegram");
    }
    info!("Telegram command listener started");

    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let handler = Arc::clone(&handler);
        async move {
            let (Some(text), Some(from)) = (msg.text(), msg.from.as_ref()) else {
                return respond(());
            };
            let incoming = IncomingMessage {
                chat: ChatRef::new(msg.chat.id.0.to_string()),
                private: msg.chat.is_private(),
                user_ref: from.id.0.to_string(),
                username: from.username.clone(),
                text: text.to_string(),
                now: Utc::now(),
            };

            if let Some(reply) = handler.handle(&incoming).await {
                if let Err(e) = bot.send_message(msg.chat.id, reply).await {
                    error!(error = %e, "Failed to send Telegram command response");
                }
            }
            respond(())
        }
    })
    .await;
}

/// Register bot commands with Telegram for the "/" menu.
async fn register_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    let commands: Vec<MenuCommand> = bot_commands()
        .into_iter()
        .map(|(cmd, desc)| MenuCommand::new(cmd, desc))
        .collect();
    bot.set_my_commands(commands).await?;
    info!("Registered bot commands with Telegram");
    Ok(())
}
