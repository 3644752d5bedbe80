//! Locks and settles rooms.
//!
//! Every path that settles a room goes through [`Settler::settle`], which
//! re-reads the room, builds a payout plan and hands it to the store's
//! conditional settlement. A concurrent settlement that got there first is
//! reported as [`SettleOutcome::AlreadySettled`] and nothing is re-applied.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::super::chat::ChatCoordinator;
use super::super::oracle::OracleResolver;
use crate::domain::{
    DomainError, FeeSchedule, Price, Resolution, Room, RoomId, RoomStatus, SettlementPlan, Side,
    UserId,
};
use crate::error::{Error, Result};
use crate::port::outbound::{
    Event, LedgerStore, NotifierRegistry, RoomStore, SettleOutcome, SettleRequest,
    SettleTrigger, SettlementEvent,
};

pub struct Settler {
    rooms: Arc<dyn RoomStore>,
    ledger: Arc<dyn LedgerStore>,
    resolver: Arc<OracleResolver>,
    chats: Arc<ChatCoordinator>,
    notifier: Arc<NotifierRegistry>,
    fees: FeeSchedule,
}

impl Settler {
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        ledger: Arc<dyn LedgerStore>,
        resolver: Arc<OracleResolver>,
        chats: Arc<ChatCoordinator>,
        notifier: Arc<NotifierRegistry>,
        fees: FeeSchedule,
    ) -> Self {
        Self {
            rooms,
            ledger,
            resolver,
            chats,
            notifier,
            fees,
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &OracleResolver {
        &self.resolver
    }

    #[must_use]
    pub fn fees(&self) -> FeeSchedule {
        self.fees
    }

    /// `OPEN → LOCKED` with an optional price snapshot.
    ///
    /// Returns false if the room was no longer open.
    pub async fn lock(&self, room: &Room, lock_price: Option<Price>) -> Result<bool> {
        if !self.rooms.lock_room(&room.id, lock_price, Utc::now()).await? {
            debug!(room_id = %room.id, "Room already left OPEN, skipping lock");
            return Ok(false);
        }
        info!(room_id = %room.id, lock_price = ?lock_price, "Room locked");
        self.notifier.notify_all(Event::RoomLocked {
            room_id: room.id.clone(),
            title: room.title.clone(),
            chat: room.chat.clone(),
            lock_price,
        });
        self.chats.open_discussion(room).await;
        Ok(true)
    }

    /// Close betting once the lock or settle deadline has passed.
    ///
    /// The lock price is a display snapshot; settlement always re-reads the
    /// oracle.
    ///
    /// # Errors
    /// Returns [`DomainError::RoomNotOpen`] if the room is not open, or
    /// [`DomainError::InvalidRoom`] if no deadline has passed yet.
    pub async fn lock_at_deadline(&self, room: &Room, now: DateTime<Utc>) -> Result<bool> {
        if room.status != RoomStatus::Open {
            return Err(DomainError::RoomNotOpen.into());
        }
        if !room.lock_due(now) {
            return Err(DomainError::InvalidRoom("lock time has not been reached".into()).into());
        }
        let snapshot = if room.market.supports_early_resolution() {
            match self.resolver.observe(&room.market).await {
                Ok(value) => Some(value),
                Err(reason) => {
                    debug!(room_id = %room.id, reason = %reason, "No lock price snapshot");
                    None
                }
            }
        } else {
            None
        };
        self.lock(room, snapshot).await
    }

    /// Settle a locked room with the given winner.
    ///
    /// # Errors
    /// Returns [`DomainError::RoomNotLocked`] for rooms that are not locked,
    /// or [`DomainError::PoolMismatch`] if stored pools are inconsistent (the
    /// room is left untouched and an operator alert is raised).
    pub async fn settle(
        &self,
        room_id: &RoomId,
        winning_side: Side,
        settle_price: Option<Price>,
        trigger: SettleTrigger,
    ) -> Result<SettleOutcome> {
        let room = self
            .rooms
            .room(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;
        match room.status {
            RoomStatus::Settled => {
                debug!(room_id = %room.id, "Room already settled");
                return Ok(SettleOutcome::AlreadySettled);
            }
            RoomStatus::Locked => {}
            _ => return Err(DomainError::RoomNotLocked.into()),
        }

        let bets = self.rooms.bets(&room.id).await?;
        let plan = SettlementPlan::build(&room, &bets, winning_side, self.fees)
            .map_err(|e| self.invariant_alert(&room, e))?;

        let request = SettleRequest {
            plan,
            settle_price,
            settled_at: Utc::now(),
        };
        let outcome = match self.rooms.settle_room(&request).await {
            Ok(outcome) => outcome,
            Err(Error::Domain(e)) => return Err(self.invariant_alert(&room, e)),
            Err(e) => return Err(e),
        };

        let SettleOutcome::Settled(receipt) = &outcome else {
            debug!(room_id = %room.id, trigger = trigger.as_str(), "Settlement lost the race, no-op");
            return Ok(outcome);
        };

        let plan = &request.plan;
        info!(
            room_id = %room.id,
            winning_side = %winning_side,
            trigger = trigger.as_str(),
            total_pool = %plan.total_pool,
            distributed = %plan.distributed(),
            winners = receipt.winnings.len(),
            "Room settled"
        );

        if let Err(e) = self.chats.reclaim(&room).await {
            warn!(room_id = %room.id, error = %e, "Failed to reclaim chat");
        }

        let refs = self.external_refs(plan).await;
        let event = SettlementEvent::from_plan(&room, plan, settle_price, trigger, |id| {
            refs.get(id).cloned()
        });
        self.notifier.notify_all(Event::RoomSettled(event));

        Ok(outcome)
    }

    /// Settle a locked room with an admin decision.
    pub async fn admin_resolve(&self, room_id: &RoomId, decision: Side) -> Result<SettleOutcome> {
        let Resolution::Decided { winning_side, .. } = self.resolver.admin_resolve(decision) else {
            return Err(DomainError::RoomNotLocked.into());
        };
        self.settle(room_id, winning_side, None, SettleTrigger::Admin)
            .await
    }

    /// Lock the room if still open, then settle with an admin decision.
    pub async fn force_settle(&self, room_id: &RoomId, decision: Side) -> Result<SettleOutcome> {
        let room = self
            .rooms
            .room(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;
        if room.status == RoomStatus::Open {
            self.lock(&room, None).await?;
        }
        self.admin_resolve(room_id, decision).await
    }

    fn invariant_alert(&self, room: &Room, err: DomainError) -> Error {
        if err.is_invariant_violation() {
            error!(room_id = %room.id, error = %err, "Invariant violation, room left untouched");
            self.notifier.notify_all(Event::InvariantViolation {
                room_id: room.id.clone(),
                details: err.to_string(),
            });
        }
        err.into()
    }

    async fn external_refs(&self, plan: &SettlementPlan) -> HashMap<UserId, String> {
        let mut refs = HashMap::new();
        for payout in &plan.payouts {
            if refs.contains_key(&payout.user_id) {
                continue;
            }
            match self.ledger.user(&payout.user_id).await {
                Ok(Some(user)) => {
                    refs.insert(payout.user_id.clone(), user.external_ref);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(user_id = %payout.user_id, error = %e, "Failed to load participant");
                }
            }
        }
        refs
    }
}
