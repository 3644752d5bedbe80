//! Deadline sweep: locks rooms past their lock time and settles rooms past
//! their settle time.
//!
//! Rooms the oracle cannot decide stay `LOCKED` for an operator. The alert
//! for such a room is raised once per alert window; the window is a session
//! record, so restarts do not re-alert.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use super::settler::Settler;
use crate::domain::{Resolution, Room, RoomStatus};
use crate::port::outbound::{
    Event, NotifierRegistry, RoomStore, SessionStore, SettleOutcome, SettleTrigger,
};

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeadlinePass {
    pub locked: usize,
    pub settled: usize,
    pub pending: usize,
}

pub struct DeadlineLoop {
    rooms: Arc<dyn RoomStore>,
    settler: Arc<Settler>,
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<NotifierRegistry>,
    alert_window: Duration,
}

impl DeadlineLoop {
    pub fn new(
        rooms: Arc<dyn RoomStore>,
        settler: Arc<Settler>,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<NotifierRegistry>,
        alert_window: Duration,
    ) -> Self {
        Self {
            rooms,
            settler,
            sessions,
            notifier,
            alert_window,
        }
    }

    /// Run one sweep. Per-room failures are logged and retried next pass.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> DeadlinePass {
        let mut pass = DeadlinePass::default();

        match self.rooms.rooms_to_lock(now).await {
            Ok(rooms) => {
                for room in rooms {
                    match self.settler.lock_at_deadline(&room, now).await {
                        Ok(true) => pass.locked += 1,
                        Ok(false) => {}
                        Err(e) => warn!(room_id = %room.id, error = %e, "Failed to lock room"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "Failed to load rooms to lock"),
        }

        let due = match self.rooms.rooms_due(now).await {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!(error = %e, "Failed to load due rooms");
                return pass;
            }
        };

        for room in due {
            match self.settle_due(&room, now).await {
                Some(true) => pass.settled += 1,
                Some(false) => {}
                None => pass.pending += 1,
            }
        }

        if pass != DeadlinePass::default() {
            debug!(
                locked = pass.locked,
                settled = pass.settled,
                pending = pass.pending,
                "Deadline pass complete"
            );
        }
        pass
    }

    /// `Some(true)` if this call settled the room, `Some(false)` if another
    /// writer did or it failed, `None` if it awaits a manual decision.
    async fn settle_due(&self, room: &Room, now: DateTime<Utc>) -> Option<bool> {
        if room.status == RoomStatus::Open {
            if let Err(e) = self.settler.lock_at_deadline(room, now).await {
                warn!(room_id = %room.id, error = %e, "Failed to lock due room");
                return Some(false);
            }
        }

        match self.settler.resolver().resolve_room(room, now).await {
            Resolution::Decided {
                winning_side,
                observed,
            } => match self
                .settler
                .settle(&room.id, winning_side, observed, SettleTrigger::Deadline)
                .await
            {
                Ok(SettleOutcome::Settled(_)) => Some(true),
                Ok(SettleOutcome::AlreadySettled) => Some(false),
                Err(e) => {
                    warn!(room_id = %room.id, error = %e, "Deadline settlement failed");
                    Some(false)
                }
            },
            Resolution::Unresolvable { reason } => {
                self.alert_manual(room, &reason, now).await;
                None
            }
            Resolution::NotYetDue => Some(false),
        }
    }

    async fn alert_manual(&self, room: &Room, reason: &str, now: DateTime<Utc>) {
        let key = format!("manual-alert:{}", room.id);
        match self
            .sessions
            .claim(&key, reason, now + self.alert_window, now)
            .await
        {
            Ok(true) => {
                warn!(room_id = %room.id, reason = %reason, "Room needs manual resolution");
                self.notifier.notify_all(Event::ManualResolutionRequired {
                    room_id: room.id.clone(),
                    title: room.title.clone(),
                    reason: reason.to_string(),
                });
            }
            Ok(false) => debug!(room_id = %room.id, reason = %reason, "Room still unresolved"),
            Err(e) => warn!(room_id = %room.id, error = %e, "Failed to record manual alert"),
        }
    }
}
