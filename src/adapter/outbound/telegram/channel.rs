//! Telegram group management for pooled room chats.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::types::ChatPermissions;

use super::format::chat_id;
use crate::domain::{AccessPolicy, ChatRef};
use crate::error::{Error, Result};
use crate::port::outbound::ChannelProvider;

/// Telegram's upper bound for invite member limits.
const MAX_INVITE_MEMBERS: u32 = 99_999;

/// [`ChannelProvider`] backed by the Bot API. The bot must be an admin of
/// every pooled group.
pub struct TelegramChannel {
    bot: Bot,
}

impl TelegramChannel {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn target(chat: &ChatRef) -> Result<ChatId> {
    chat_id(chat)
        .map(ChatId)
        .ok_or_else(|| Error::Channel(format!("invalid Telegram chat id `{chat}`")))
}

fn channel_error(e: teloxide::RequestError) -> Error {
    Error::Channel(e.to_string())
}

fn permissions(policy: AccessPolicy) -> ChatPermissions {
    match policy {
        AccessPolicy::ReadOnly => ChatPermissions::empty(),
        AccessPolicy::Open => ChatPermissions::SEND_MESSAGES,
    }
}

#[async_trait]
impl ChannelProvider for TelegramChannel {
    async fn rename(&self, chat: &ChatRef, title: &str) -> Result<()> {
        self.bot
            .set_chat_title(target(chat)?, title)
            .await
            .map_err(channel_error)?;
        Ok(())
    }

    async fn set_access_policy(&self, chat: &ChatRef, policy: AccessPolicy) -> Result<()> {
        self.bot
            .set_chat_permissions(target(chat)?, permissions(policy))
            .await
            .map_err(channel_error)?;
        Ok(())
    }

    async fn create_invite(
        &self,
        chat: &ChatRef,
        member_limit: u32,
        expires_at: DateTime<Utc>,
    ) -> Result<String> {
        let link = self
            .bot
            .create_chat_invite_link(target(chat)?)
            .member_limit(member_limit.clamp(1, MAX_INVITE_MEMBERS))
            .expire_date(expires_at)
            .await
            .map_err(channel_error)?;
        Ok(link.invite_link)
    }

    async fn revoke_invite(&self, chat: &ChatRef, invite_link: &str) -> Result<()> {
        self.bot
            .revoke_chat_invite_link(target(chat)?, invite_link)
            .await
            .map_err(channel_error)?;
        Ok(())
    }
}
