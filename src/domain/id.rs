//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Create a new identifier with a generated UUID.
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a prediction room.
    RoomId
);

uuid_id!(
    /// Unique identifier for an account holder.
    UserId
);

uuid_id!(
    /// Unique identifier for a wager.
    BetId
);

uuid_id!(
    /// Unique identifier for a ledger entry.
    TransactionId
);

uuid_id!(
    /// Unique identifier for a chat pool slot.
    ChatSlotId
);

/// Reference to an external communication channel (e.g. a Telegram chat id).
///
/// The inner String is private to ensure all construction goes through
/// the defined constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatRef(String);

impl ChatRef {
    /// Create a new `ChatRef` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the chat reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ChatRef {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ChatRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(RoomId::new(), RoomId::new());
        assert_ne!(UserId::new(), UserId::new());
    }

    #[test]
    fn ids_round_trip_through_strings() {
        let id = RoomId::from("room-1");
        assert_eq!(id.as_str(), "room-1");
        assert_eq!(id.to_string(), "room-1");
        assert_eq!(RoomId::from(id.to_string()), id);
    }

    #[test]
    fn chat_ref_keeps_raw_value() {
        let chat = ChatRef::new("-100123");
        assert_eq!(chat.as_str(), "-100123");
        assert_eq!(ChatRef::from("-100123"), chat);
    }
}
