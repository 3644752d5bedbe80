//! Reusable communication channel slots.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::id::{ChatRef, ChatSlotId, RoomId};

/// Allocation state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChatSlotStatus {
    Free,
    Assigned,
}

impl ChatSlotStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Assigned => "ASSIGNED",
        }
    }
}

impl fmt::Display for ChatSlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatSlotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(Self::Free),
            "ASSIGNED" => Ok(Self::Assigned),
            other => Err(format!("unknown chat slot status '{other}'")),
        }
    }
}

/// One pre-provisioned channel in the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPoolEntry {
    pub id: ChatSlotId,
    pub chat: ChatRef,
    pub status: ChatSlotStatus,
    pub room_id: Option<RoomId>,
}

/// Who may post in a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Members can read but not post.
    ReadOnly,
    /// Members can post text.
    Open,
}
