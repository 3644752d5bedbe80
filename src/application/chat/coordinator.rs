//! Assigns pooled channels to rooms and reclaims them after settlement.
//!
//! Pool bookkeeping (FREE/ASSIGNED, the room's channel link) is persisted
//! first; platform calls (rename, permissions, invites) are best-effort and
//! only logged on failure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::cooldown::Cooldown;
use crate::domain::{AccessPolicy, ChatPoolEntry, ChatRef, DomainError, Room, User};
use crate::error::Result;
use crate::port::outbound::{
    ChannelProvider, ChatPoolStore, Event, LedgerStore, NotifierRegistry, RoomStore,
};

/// Outcome of the room-chat access gate.
#[derive(Debug, Clone, PartialEq)]
pub enum Gate {
    /// Caller may run the command.
    Allowed { room: Room, user: User },
    /// The chat is not linked to a live room.
    NotRoomChat,
    /// Caller holds no active bet in the room.
    Refused,
    /// Repeated command inside the cooldown window; drop silently.
    Throttled,
    /// Repeated wager inside the cooldown window; tell the caller to wait.
    PleaseWait,
}

/// Message sent to non-participants.
pub const REFUSAL_MESSAGE: &str = "Only players with an active bet in this room can use commands here.";

/// Message sent when a wager is throttled.
pub const PLEASE_WAIT_MESSAGE: &str = "Please wait a moment before betting again.";

/// Command name that receives an explicit throttle reply.
pub const WAGER_COMMAND: &str = "bet";

pub struct ChatCoordinator {
    pool: Arc<dyn ChatPoolStore>,
    rooms: Arc<dyn RoomStore>,
    ledger: Arc<dyn LedgerStore>,
    channel: Arc<dyn ChannelProvider>,
    notifier: Arc<NotifierRegistry>,
    cooldown: Cooldown,
}

impl ChatCoordinator {
    pub fn new(
        pool: Arc<dyn ChatPoolStore>,
        rooms: Arc<dyn RoomStore>,
        ledger: Arc<dyn LedgerStore>,
        channel: Arc<dyn ChannelProvider>,
        notifier: Arc<NotifierRegistry>,
        cooldown: Cooldown,
    ) -> Self {
        Self {
            pool,
            rooms,
            ledger,
            channel,
            notifier,
            cooldown,
        }
    }

    /// Register a channel with the pool.
    pub async fn provision(&self, chat: &ChatRef) -> Result<ChatPoolEntry> {
        let entry = self.pool.add_chat(chat).await?;
        info!(chat = %chat, status = %entry.status, "Chat added to pool");
        Ok(entry)
    }

    pub async fn slots(&self) -> Result<Vec<ChatPoolEntry>> {
        self.pool.chats().await
    }

    /// Take a free channel for the room and prepare it.
    ///
    /// # Errors
    /// Returns [`DomainError::PoolExhausted`] when no channel is free; an
    /// operator alert is raised as well.
    pub async fn assign(&self, room: &Room) -> Result<ChatPoolEntry> {
        let Some(slot) = self.pool.claim_free_chat(&room.id).await? else {
            warn!(room_id = %room.id, "No free chats available in pool");
            self.notifier.notify_all(Event::ChatPoolExhausted {
                room_id: room.id.clone(),
                title: room.title.clone(),
            });
            return Err(DomainError::PoolExhausted.into());
        };

        let chat = &slot.chat;
        let title = format!("ROOM #{} - {}", room.short_id(), room.title);
        if let Err(e) = self.channel.rename(chat, &title).await {
            warn!(room_id = %room.id, chat = %chat, error = %e, "Failed to rename chat");
        }
        if let Err(e) = self
            .channel
            .set_access_policy(chat, AccessPolicy::ReadOnly)
            .await
        {
            warn!(room_id = %room.id, chat = %chat, error = %e, "Failed to restrict chat");
        }

        let invite = match self
            .channel
            .create_invite(chat, room.capacity, room.settle_at)
            .await
        {
            Ok(link) => Some(link),
            Err(e) => {
                warn!(room_id = %room.id, chat = %chat, error = %e, "Failed to create invite");
                None
            }
        };
        self.rooms
            .set_room_chat(&room.id, Some(chat), invite.as_deref())
            .await?;

        info!(room_id = %room.id, chat = %chat, "Chat assigned to room");
        Ok(slot)
    }

    /// Let members post once betting has closed.
    pub async fn open_discussion(&self, room: &Room) {
        let Some(chat) = &room.chat else {
            return;
        };
        if let Err(e) = self.channel.set_access_policy(chat, AccessPolicy::Open).await {
            warn!(room_id = %room.id, chat = %chat, error = %e, "Failed to open chat");
        }
    }

    /// Return the room's channel to the pool.
    ///
    /// Platform failures are logged; the pool and room rows are updated
    /// regardless.
    pub async fn reclaim(&self, room: &Room) -> Result<()> {
        if let Some(chat) = &room.chat {
            if let Some(invite) = &room.invite_link {
                if let Err(e) = self.channel.revoke_invite(chat, invite).await {
                    warn!(room_id = %room.id, chat = %chat, error = %e, "Failed to revoke invite");
                }
            }
            let title = format!("ROOM #{} - closed", room.short_id());
            if let Err(e) = self.channel.rename(chat, &title).await {
                warn!(room_id = %room.id, chat = %chat, error = %e, "Failed to rename chat");
            }
            if let Err(e) = self
                .channel
                .set_access_policy(chat, AccessPolicy::ReadOnly)
                .await
            {
                warn!(room_id = %room.id, chat = %chat, error = %e, "Failed to restrict chat");
            }
        }

        match self.pool.release_chat(&room.id).await? {
            Some(chat) => info!(room_id = %room.id, chat = %chat, "Chat returned to pool"),
            None => debug!(room_id = %room.id, "Room had no pooled chat"),
        }
        Ok(())
    }

    /// Access gate for commands issued inside a room's channel.
    pub async fn authorize(
        &self,
        chat: &ChatRef,
        user_ref: &str,
        command: &str,
        now: DateTime<Utc>,
    ) -> Result<Gate> {
        let Some(room) = self.rooms.room_by_chat(chat).await? else {
            return Ok(Gate::NotRoomChat);
        };
        let Some(user) = self.ledger.user_by_external_ref(user_ref).await? else {
            return Ok(Gate::Refused);
        };
        if !self.rooms.has_active_bet(&room.id, &user.id).await? {
            return Ok(Gate::Refused);
        }
        if !self
            .cooldown
            .try_acquire(&room.id, user_ref, command, now)
            .await?
        {
            return Ok(if command == WAGER_COMMAND {
                Gate::PleaseWait
            } else {
                Gate::Throttled
            });
        }
        Ok(Gate::Allowed { room, user })
    }
}
