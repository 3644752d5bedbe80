//! Persistence ports for rooms, the ledger, the chat pool and session state.
//!
//! Every method that changes money is atomic: the balance change and its
//! ledger record commit together or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Amount, Bet, BetFilter, BetTotals, ChatPoolEntry, ChatRef, LedgerEntry, PlayerBet, Price,
    ReferralStats, Room, RoomId, RoomStatus, SettlementPlan, Side, User, UserId, WagerStage,
};
use crate::error::Result;

/// One page of a listing. Pages are zero-indexed.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// `ceil(total / page_size)`.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            0
        } else {
            self.total.div_ceil(self.page_size)
        }
    }
}

/// A stake to admit into a room.
#[derive(Debug, Clone, PartialEq)]
pub struct Wager {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub side: Side,
    pub amount: Amount,
    pub stage: WagerStage,
}

/// A request to apply a settlement plan.
#[derive(Debug, Clone, PartialEq)]
pub struct SettleRequest {
    pub plan: SettlementPlan,
    pub settle_price: Option<Price>,
    pub settled_at: DateTime<Utc>,
}

/// Balance credits applied by a settlement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettlementReceipt {
    pub winnings: Vec<(UserId, Amount)>,
    pub host_fee: Option<(UserId, Amount)>,
    pub referral_rewards: Vec<(UserId, Amount)>,
}

/// Result of a settlement attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SettleOutcome {
    /// This call performed the settlement.
    Settled(SettlementReceipt),
    /// Another writer settled the room first; nothing was changed.
    AlreadySettled,
}

/// Storage operations for rooms and bets.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Insert a new room.
    async fn insert_room(&self, room: &Room) -> Result<()>;

    /// Get a room by ID.
    async fn room(&self, id: &RoomId) -> Result<Option<Room>>;

    /// Get the room currently linked to a channel.
    async fn room_by_chat(&self, chat: &ChatRef) -> Result<Option<Room>>;

    /// List rooms, newest first.
    async fn list_rooms(
        &self,
        status: Option<RoomStatus>,
        page: usize,
        page_size: usize,
    ) -> Result<Page<Room>>;

    /// `OPEN` rooms whose lock or settle time has passed.
    async fn rooms_to_lock(&self, now: DateTime<Utc>) -> Result<Vec<Room>>;

    /// `OPEN` or `LOCKED` rooms whose settle time has passed.
    async fn rooms_due(&self, now: DateTime<Utc>) -> Result<Vec<Room>>;

    /// `OPEN` rooms on threshold markets (eligible for early settlement).
    async fn open_threshold_rooms(&self) -> Result<Vec<Room>>;

    /// `LOCKED` rooms past their settle time, awaiting an admin decision.
    async fn manual_queue(&self, now: DateTime<Utc>) -> Result<Vec<Room>>;

    /// All bets in a room.
    async fn bets(&self, room_id: &RoomId) -> Result<Vec<Bet>>;

    /// A player's bets across rooms, newest first.
    async fn bets_for_user(
        &self,
        user_id: &UserId,
        filter: BetFilter,
        page: usize,
        page_size: usize,
    ) -> Result<Page<PlayerBet>>;

    /// Count, stake and payout over every bet matching `filter`.
    async fn bet_totals(&self, user_id: &UserId, filter: BetFilter) -> Result<BetTotals>;

    /// Whether the user holds an `ACTIVE` bet in the room. Queued seats do
    /// not count.
    async fn has_active_bet(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool>;

    /// Admit and record a wager in one transaction.
    ///
    /// Debits the stake, inserts the bet, recounts participants, bumps the
    /// pools and records a `BET` ledger entry. Admission failures leave every
    /// row untouched.
    async fn place_bet(&self, wager: &Wager) -> Result<Bet>;

    /// `QUEUING → OPEN`, activating queued bets. Returns false if the room
    /// was not queuing.
    async fn launch_room(&self, id: &RoomId) -> Result<bool>;

    /// `OPEN → LOCKED` with an optional price snapshot. Returns false if the
    /// room was not open.
    async fn lock_room(
        &self,
        id: &RoomId,
        lock_price: Option<Price>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// `LOCKED → SETTLED` with all payouts, as one conditional transaction.
    async fn settle_room(&self, request: &SettleRequest) -> Result<SettleOutcome>;

    /// Link or clear a room's channel and invite.
    async fn set_room_chat(
        &self,
        id: &RoomId,
        chat: Option<&ChatRef>,
        invite_link: Option<&str>,
    ) -> Result<()>;
}

/// Storage operations for users and their ledger.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert a new user.
    async fn insert_user(&self, user: &User) -> Result<()>;

    async fn user(&self, id: &UserId) -> Result<Option<User>>;

    async fn user_by_external_ref(&self, external_ref: &str) -> Result<Option<User>>;

    async fn user_by_referral_code(&self, code: &str) -> Result<Option<User>>;

    /// Credit a deposit and record it.
    async fn deposit(&self, id: &UserId, amount: Amount, memo: Option<&str>)
        -> Result<LedgerEntry>;

    /// Debit a withdrawal and record it. Fails with `InsufficientBalance`
    /// without touching the balance.
    async fn withdraw(
        &self,
        id: &UserId,
        amount: Amount,
        memo: Option<&str>,
    ) -> Result<LedgerEntry>;

    /// Users referred by this user's code and the rewards credited for
    /// them. Fails with `UserNotFound` for an unknown user.
    async fn referral_stats(&self, id: &UserId) -> Result<ReferralStats>;

    /// Ledger history, newest first.
    async fn transactions(
        &self,
        id: &UserId,
        page: usize,
        page_size: usize,
    ) -> Result<Page<LedgerEntry>>;
}

/// Storage operations for the channel pool.
#[async_trait]
pub trait ChatPoolStore: Send + Sync {
    /// Add a channel to the pool. Adding a known channel is a no-op.
    async fn add_chat(&self, chat: &ChatRef) -> Result<ChatPoolEntry>;

    async fn chats(&self) -> Result<Vec<ChatPoolEntry>>;

    /// Atomically take a `FREE` slot for the room.
    async fn claim_free_chat(&self, room_id: &RoomId) -> Result<Option<ChatPoolEntry>>;

    /// Mark the room's slot `FREE`. Returns the released channel, if any.
    async fn release_chat(&self, room_id: &RoomId) -> Result<Option<ChatRef>>;
}

/// Keyed state records with explicit expiry.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store `value` under `key` only if no unexpired record exists.
    ///
    /// Returns true if the record was written.
    async fn claim(
        &self,
        key: &str,
        value: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Store `value` under `key`, replacing any existing record.
    async fn put(&self, key: &str, value: &str, expires_at: DateTime<Utc>) -> Result<()>;

    /// Unexpired value for `key`.
    async fn get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Delete expired records. Returns count deleted.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
