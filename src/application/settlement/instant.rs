//! Instant-target sweep.
//!
//! Polls open threshold rooms and settles them as YES as soon as the observed
//! value reaches the target. A value below the target proves nothing, so this
//! loop never settles NO.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::settler::Settler;
use crate::domain::{Room, Side};
use crate::port::outbound::{RoomStore, SettleOutcome, SettleTrigger};

pub struct InstantTargetLoop {
    rooms: Arc<dyn RoomStore>,
    settler: Arc<Settler>,
}

impl InstantTargetLoop {
    pub fn new(rooms: Arc<dyn RoomStore>, settler: Arc<Settler>) -> Self {
        Self { rooms, settler }
    }

    /// Run one sweep. Returns the number of rooms this pass settled.
    pub async fn run_pass(&self) -> usize {
        let rooms = match self.rooms.open_threshold_rooms().await {
            Ok(rooms) => rooms,
            Err(e) => {
                warn!(error = %e, "Failed to load open rooms");
                return 0;
            }
        };

        let mut settled = 0;
        for room in rooms {
            if self.check(&room).await {
                settled += 1;
            }
        }
        settled
    }

    async fn check(&self, room: &Room) -> bool {
        let observed = match self
            .settler
            .resolver()
            .observe_with_retry(&room.market)
            .await
        {
            Ok(value) => value,
            Err(reason) => {
                debug!(room_id = %room.id, reason = %reason, "No observation this cycle");
                return false;
            }
        };
        if observed < room.target {
            return false;
        }

        info!(
            room_id = %room.id,
            observed = %observed,
            target = %room.target,
            "Target reached before deadline"
        );
        match self.settler.lock(room, Some(observed)).await {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!(room_id = %room.id, error = %e, "Failed to lock room");
                return false;
            }
        }

        match self
            .settler
            .settle(&room.id, Side::Yes, Some(observed), SettleTrigger::InstantTarget)
            .await
        {
            Ok(SettleOutcome::Settled(_)) => true,
            Ok(SettleOutcome::AlreadySettled) => false,
            Err(e) => {
                warn!(room_id = %room.id, error = %e, "Instant settlement failed");
                false
            }
        }
    }
}
