//! SQLite chat pool store implementation.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use super::database::connection::{encode_time, with_conn, DbPool};
use super::database::model::ChatSlotRow;
use super::database::schema::{chat_pool, rooms};
use crate::domain::{ChatPoolEntry, ChatRef, ChatSlotId, ChatSlotStatus, RoomId};
use crate::error::Result;
use crate::port::outbound::store::ChatPoolStore;

/// SQLite-backed channel pool.
#[derive(Clone)]
pub struct SqliteChatPoolStore {
    pool: DbPool,
}

impl SqliteChatPoolStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChatPoolStore for SqliteChatPoolStore {
    async fn add_chat(&self, chat: &ChatRef) -> Result<ChatPoolEntry> {
        let row = ChatSlotRow {
            id: ChatSlotId::new().to_string(),
            chat_id: chat.to_string(),
            status: ChatSlotStatus::Free.as_str().to_string(),
            room_id: None,
            created_at: encode_time(Utc::now()),
        };
        with_conn(&self.pool, move |conn| {
            diesel::insert_or_ignore_into(chat_pool::table)
                .values(&row)
                .execute(conn)?;
            chat_pool::table
                .filter(chat_pool::chat_id.eq(&row.chat_id))
                .select(ChatSlotRow::as_select())
                .first(conn)?
                .into_entry()
        })
        .await
    }

    async fn chats(&self) -> Result<Vec<ChatPoolEntry>> {
        with_conn(&self.pool, move |conn| {
            chat_pool::table
                .order((chat_pool::created_at.asc(), chat_pool::id.asc()))
                .select(ChatSlotRow::as_select())
                .load(conn)?
                .into_iter()
                .map(ChatSlotRow::into_entry)
                .collect()
        })
        .await
    }

    async fn claim_free_chat(&self, room_id: &RoomId) -> Result<Option<ChatPoolEntry>> {
        let room_id = room_id.to_string();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let free: Option<ChatSlotRow> = chat_pool::table
                    .filter(chat_pool::status.eq(ChatSlotStatus::Free.as_str()))
                    .order((chat_pool::created_at.asc(), chat_pool::id.asc()))
                    .select(ChatSlotRow::as_select())
                    .first(conn)
                    .optional()?;
                let Some(mut slot) = free else {
                    return Ok(None);
                };

                let claimed = diesel::update(
                    chat_pool::table
                        .find(&slot.id)
                        .filter(chat_pool::status.eq(ChatSlotStatus::Free.as_str())),
                )
                .set((
                    chat_pool::status.eq(ChatSlotStatus::Assigned.as_str()),
                    chat_pool::room_id.eq(Some(&room_id)),
                ))
                .execute(conn)?;
                if claimed == 0 {
                    return Ok(None);
                }

                diesel::update(rooms::table.find(&room_id))
                    .set(rooms::chat_id.eq(Some(&slot.chat_id)))
                    .execute(conn)?;

                slot.status = ChatSlotStatus::Assigned.as_str().to_string();
                slot.room_id = Some(room_id.clone());
                slot.into_entry().map(Some)
            })
        })
        .await
    }

    async fn release_chat(&self, room_id: &RoomId) -> Result<Option<ChatRef>> {
        let room_id = room_id.to_string();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let chat: Option<String> = chat_pool::table
                    .filter(chat_pool::room_id.eq(&room_id))
                    .select(chat_pool::chat_id)
                    .first(conn)
                    .optional()?;

                diesel::update(chat_pool::table.filter(chat_pool::room_id.eq(&room_id)))
                    .set((
                        chat_pool::status.eq(ChatSlotStatus::Free.as_str()),
                        chat_pool::room_id.eq(None::<String>),
                    ))
                    .execute(conn)?;
                diesel::update(rooms::table.find(&room_id))
                    .set((
                        rooms::chat_id.eq(None::<String>),
                        rooms::invite_link.eq(None::<String>),
                    ))
                    .execute(conn)?;

                Ok(chat.map(ChatRef::from))
            })
        })
        .await
    }
}
