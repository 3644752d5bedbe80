//! Channel-pool provider port.
//!
//! All operations are best-effort from the caller's point of view: failures
//! are logged and never roll back the room transition that triggered them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{AccessPolicy, ChatRef};
use crate::error::Result;

#[async_trait]
pub trait ChannelProvider: Send + Sync {
    /// Change the channel's title.
    async fn rename(&self, chat: &ChatRef, title: &str) -> Result<()>;

    /// Change who may post.
    async fn set_access_policy(&self, chat: &ChatRef, policy: AccessPolicy) -> Result<()>;

    /// Create an invite capped at `member_limit` joins, expiring at `expires_at`.
    async fn create_invite(
        &self,
        chat: &ChatRef,
        member_limit: u32,
        expires_at: DateTime<Utc>,
    ) -> Result<String>;

    async fn revoke_invite(&self, chat: &ChatRef, invite_link: &str) -> Result<()>;
}

/// Provider used when no chat platform is configured. Every call succeeds
/// except invites, which have nothing to point at.
pub struct NullChannel;

#[async_trait]
impl ChannelProvider for NullChannel {
    async fn rename(&self, _chat: &ChatRef, _title: &str) -> Result<()> {
        Ok(())
    }

    async fn set_access_policy(&self, _chat: &ChatRef, _policy: AccessPolicy) -> Result<()> {
        Ok(())
    }

    async fn create_invite(
        &self,
        _chat: &ChatRef,
        _member_limit: u32,
        _expires_at: DateTime<Utc>,
    ) -> Result<String> {
        Err(crate::error::Error::Channel(
            "no chat platform configured".into(),
        ))
    }

    async fn revoke_invite(&self, _chat: &ChatRef, _invite_link: &str) -> Result<()> {
        Ok(())
    }
}
