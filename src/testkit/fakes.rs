//! In-memory port implementations for tests.
//!
//! Every fake is cheap to clone; clones share state so a test can keep a
//! handle after moving the fake into the application.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::domain::{AccessPolicy, ChatRef, MarketKind, Price};
use crate::error::{Error, Result};
use crate::port::outbound::{
    ChannelProvider, Credential, Custody, Event, Notifier, PriceOracle, Secret, SessionStore,
};

// ---------------------------------------------------------------------------
// StaticOracle
// ---------------------------------------------------------------------------

/// Oracle answering from a table keyed by symbol or token address.
///
/// Unknown references fail, as does everything while `set_failing(true)`.
#[derive(Clone, Default)]
pub struct StaticOracle {
    values: Arc<Mutex<HashMap<String, Price>>>,
    failing: Arc<Mutex<bool>>,
    calls: Arc<AtomicUsize>,
}

impl StaticOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value returned for `reference`.
    pub fn set(&self, reference: &str, value: Price) {
        self.values.lock().insert(reference.to_string(), value);
    }

    pub fn clear(&self, reference: &str) {
        self.values.lock().remove(reference);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Number of observations requested so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for StaticOracle {
    fn name(&self) -> &str {
        "static"
    }

    async fn observed_value(&self, market: &MarketKind) -> Result<Price> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.failing.lock() {
            return Err(Error::Oracle("feed unavailable".into()));
        }
        let reference = market
            .reference()
            .ok_or_else(|| Error::Oracle("custom market".into()))?;
        self.values
            .lock()
            .get(reference)
            .copied()
            .ok_or_else(|| Error::Oracle(format!("no value for {reference}")))
    }
}

// ---------------------------------------------------------------------------
// RecordingChannel
// ---------------------------------------------------------------------------

/// A call made against the channel provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCall {
    Rename { chat: ChatRef, title: String },
    SetAccess { chat: ChatRef, policy: AccessPolicy },
    CreateInvite { chat: ChatRef, member_limit: u32 },
    RevokeInvite { chat: ChatRef, invite_link: String },
}

/// Channel provider that records calls and can be made to fail.
#[derive(Clone, Default)]
pub struct RecordingChannel {
    calls: Arc<Mutex<Vec<ChannelCall>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (after being recorded).
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ChannelCall> {
        self.calls.lock().clone()
    }

    /// Access policies applied to `chat`, in order.
    #[must_use]
    pub fn policies(&self, chat: &ChatRef) -> Vec<AccessPolicy> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                ChannelCall::SetAccess { chat: c, policy } if c == chat => Some(*policy),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ChannelCall) -> Result<()> {
        self.calls.lock().push(call);
        if *self.failing.lock() {
            return Err(Error::Channel("platform unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelProvider for RecordingChannel {
    async fn rename(&self, chat: &ChatRef, title: &str) -> Result<()> {
        self.record(ChannelCall::Rename {
            chat: chat.clone(),
            title: title.to_string(),
        })
    }

    async fn set_access_policy(&self, chat: &ChatRef, policy: AccessPolicy) -> Result<()> {
        self.record(ChannelCall::SetAccess {
            chat: chat.clone(),
            policy,
        })
    }

    async fn create_invite(
        &self,
        chat: &ChatRef,
        member_limit: u32,
        _expires_at: DateTime<Utc>,
    ) -> Result<String> {
        self.record(ChannelCall::CreateInvite {
            chat: chat.clone(),
            member_limit,
        })?;
        Ok(format!("https://t.me/+invite-{chat}"))
    }

    async fn revoke_invite(&self, chat: &ChatRef, invite_link: &str) -> Result<()> {
        self.record(ChannelCall::RevokeInvite {
            chat: chat.clone(),
            invite_link: invite_link.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

/// Notifier that keeps every event it receives.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: Event) {
        self.events.lock().push(event);
    }
}

// ---------------------------------------------------------------------------
// MemoryCustody
// ---------------------------------------------------------------------------

/// Custody fake: handles are `addr-N`, blobs are the secret behind `enc:`.
#[derive(Clone, Default)]
pub struct MemoryCustody {
    issued: Arc<AtomicUsize>,
}

impl MemoryCustody {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Custody for MemoryCustody {
    async fn generate_credential(&self) -> Result<Credential> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(Credential {
            handle: format!("addr-{n}"),
            secret: Secret::new(format!("secret-{n}")),
        })
    }

    async fn encrypt(&self, secret: &Secret) -> Result<String> {
        Ok(format!("enc:{}", secret.expose()))
    }

    async fn decrypt(&self, blob: &str) -> Result<Secret> {
        blob.strip_prefix("enc:")
            .map(Secret::new)
            .ok_or_else(|| Error::Custody("blob was not produced by this custody".into()))
    }
}

// ---------------------------------------------------------------------------
// MemorySessionStore
// ---------------------------------------------------------------------------

/// Session store backed by a map.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    records: Arc<Mutex<HashMap<String, (String, DateTime<Utc>)>>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn claim(
        &self,
        key: &str,
        value: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut records = self.records.lock();
        if let Some((_, live_until)) = records.get(key) {
            if *live_until > now {
                return Ok(false);
            }
        }
        records.insert(key.to_string(), (value.to_string(), expires_at));
        Ok(true)
    }

    async fn put(&self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()> {
        self.records
            .lock()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        Ok(self
            .records
            .lock()
            .get(key)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(value, _)| value.clone()))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.records.lock().remove(key);
        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(before - records.len())
    }
}
