//! Per-(room, user, command) throttling backed by the session store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::RoomId;
use crate::error::Result;
use crate::port::outbound::SessionStore;

/// Fixed-window cooldown.
pub struct Cooldown {
    sessions: Arc<dyn SessionStore>,
    window: Duration,
}

impl Cooldown {
    pub fn new(sessions: Arc<dyn SessionStore>, window: Duration) -> Self {
        Self { sessions, window }
    }

    fn key(room_id: &RoomId, user_ref: &str, command: &str) -> String {
        format!("cooldown:{room_id}:{user_ref}:{command}")
    }

    /// Claim the window. Returns false if a previous claim is still live.
    pub async fn try_acquire(
        &self,
        room_id: &RoomId,
        user_ref: &str,
        command: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.sessions
            .claim(
                &Self::key(room_id, user_ref, command),
                "1",
                now + self.window,
                now,
            )
            .await
    }
}
