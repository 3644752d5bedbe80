//! Room lifecycle use cases: creation, admission, launch and queries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::super::chat::ChatCoordinator;
use super::super::settlement::Settler;
use crate::domain::{
    Amount, Bet, DomainError, NewRoom, Room, RoomId, RoomStatus, Side, UserId, WagerStage,
};
use crate::error::{Error, Result};
use crate::port::outbound::{LedgerStore, Page, RoomStore, SettleOutcome, Wager};

/// A room together with its bets.
#[derive(Debug, Clone)]
pub struct RoomDetails {
    pub room: Room,
    pub bets: Vec<Bet>,
}

pub struct RoomService {
    rooms: Arc<dyn RoomStore>,
    ledger: Arc<dyn LedgerStore>,
    chats: Arc<ChatCoordinator>,
    settler: Arc<Settler>,
}

impl RoomService {
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        ledger: Arc<dyn LedgerStore>,
        chats: Arc<ChatCoordinator>,
        settler: Arc<Settler>,
    ) -> Self {
        Self {
            rooms,
            ledger,
            chats,
            settler,
        }
    }

    /// Create a room. Rooms created `OPEN` get a chat straight away; if the
    /// pool is exhausted the room stays open without one.
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidRoom`] for bad parameters and
    /// [`DomainError::UserNotFound`] for an unknown creator.
    pub async fn create_room(&self, draft: NewRoom, now: DateTime<Utc>) -> Result<Room> {
        draft.validate(now)?;
        if let Some(creator) = &draft.creator {
            self.ledger
                .user(creator)
                .await?
                .ok_or(DomainError::UserNotFound)?;
        }

        let mut room = draft.into_room(now);
        self.rooms.insert_room(&room).await?;
        info!(
            room_id = %room.id,
            market = room.market.label(),
            status = %room.status,
            "Room created"
        );

        if room.status == RoomStatus::Open {
            self.attach_chat(&mut room).await?;
        }
        Ok(room)
    }

    /// Place an active bet in an open room.
    pub async fn place_bet(
        &self,
        user_id: &UserId,
        room_id: &RoomId,
        side: Side,
        amount: Amount,
    ) -> Result<Bet> {
        self.wager(user_id, room_id, side, amount, WagerStage::Open)
            .await
    }

    /// Reserve a seat in a queuing room; the stake is debited now.
    pub async fn join_queue(
        &self,
        user_id: &UserId,
        room_id: &RoomId,
        side: Side,
        amount: Amount,
    ) -> Result<Bet> {
        self.wager(user_id, room_id, side, amount, WagerStage::Queue)
            .await
    }

    async fn wager(
        &self,
        user_id: &UserId,
        room_id: &RoomId,
        side: Side,
        amount: Amount,
        stage: WagerStage,
    ) -> Result<Bet> {
        let wager = Wager {
            room_id: room_id.clone(),
            user_id: user_id.clone(),
            side,
            amount,
            stage,
        };
        let bet = self.rooms.place_bet(&wager).await?;
        info!(
            room_id = %room_id,
            user_id = %user_id,
            side = %side,
            amount = %amount,
            "Bet placed"
        );
        Ok(bet)
    }

    /// `QUEUING → OPEN`: activates queued bets and assigns a chat.
    ///
    /// # Errors
    /// Returns [`DomainError::RoomNotQueuing`] if another caller launched
    /// the room first or it was never queued.
    pub async fn launch_room(&self, room_id: &RoomId) -> Result<Room> {
        let room = self.load(room_id).await?;
        room.ensure_transition(RoomStatus::Open)?;
        if !self.rooms.launch_room(room_id).await? {
            return Err(DomainError::RoomNotQueuing.into());
        }
        let mut room = self.load(room_id).await?;
        info!(room_id = %room.id, players = room.current_players, "Room launched");
        self.attach_chat(&mut room).await?;
        Ok(room)
    }

    pub async fn list_rooms(
        &self,
        status: Option<RoomStatus>,
        page: usize,
        page_size: usize,
    ) -> Result<Page<Room>> {
        self.rooms.list_rooms(status, page, page_size.max(1)).await
    }

    pub async fn room_details(&self, room_id: &RoomId) -> Result<RoomDetails> {
        let room = self.load(room_id).await?;
        let bets = self.rooms.bets(room_id).await?;
        Ok(RoomDetails { room, bets })
    }

    /// Locked rooms past their settle time awaiting an operator.
    pub async fn manual_queue(&self, now: DateTime<Utc>) -> Result<Vec<Room>> {
        self.rooms.manual_queue(now).await
    }

    pub async fn admin_resolve(&self, room_id: &RoomId, side: Side) -> Result<SettleOutcome> {
        self.settler.admin_resolve(room_id, side).await
    }

    pub async fn force_settle(&self, room_id: &RoomId, side: Side) -> Result<SettleOutcome> {
        self.settler.force_settle(room_id, side).await
    }

    async fn load(&self, room_id: &RoomId) -> Result<Room> {
        self.rooms
            .room(room_id)
            .await?
            .ok_or_else(|| DomainError::RoomNotFound.into())
    }

    async fn attach_chat(&self, room: &mut Room) -> Result<()> {
        match self.chats.assign(room).await {
            Ok(slot) => {
                room.chat = Some(slot.chat);
                if let Some(updated) = self.rooms.room(&room.id).await? {
                    room.invite_link = updated.invite_link;
                }
                Ok(())
            }
            Err(Error::Domain(DomainError::PoolExhausted)) => {
                warn!(room_id = %room.id, "Room is open without a chat");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
