//! Notifier port for event notifications.
//!
//! This module defines the trait for sending notifications about room
//! events such as settlements, locks and operator alerts. Delivery is
//! best-effort: notifiers log failures and never block settlement.

use rust_decimal::Decimal;

use crate::domain::{ChatRef, Price, Room, RoomId, SettlementPlan, Side, UserId};

/// Events that can trigger notifications.
#[derive(Debug, Clone)]
pub enum Event {
    /// A room was settled and payouts applied.
    RoomSettled(SettlementEvent),
    /// Betting closed on a room.
    RoomLocked {
        room_id: RoomId,
        title: String,
        chat: Option<ChatRef>,
        lock_price: Option<Price>,
    },
    /// The oracle could not decide a due room.
    ManualResolutionRequired {
        room_id: RoomId,
        title: String,
        reason: String,
    },
    /// No free channel was available for a room.
    ChatPoolExhausted { room_id: RoomId, title: String },
    /// Stored state broke a room invariant; the room was left untouched.
    InvariantViolation { room_id: RoomId, details: String },
}

/// What caused a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleTrigger {
    /// The settle deadline passed and the oracle decided.
    Deadline,
    /// The target was reached before the deadline.
    InstantTarget,
    /// An operator supplied the outcome.
    Admin,
}

impl SettleTrigger {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deadline => "deadline",
            Self::InstantTarget => "instant_target",
            Self::Admin => "admin",
        }
    }
}

/// One participant's result.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantOutcome {
    pub user_id: UserId,
    /// Identity on the chat platform, when known.
    pub external_ref: Option<String>,
    pub side: Side,
    pub amount: Decimal,
    pub won: bool,
    pub payout: Decimal,
}

impl ParticipantOutcome {
    #[must_use]
    pub fn profit(&self) -> Decimal {
        self.payout - self.amount
    }
}

/// Room settlement event.
#[derive(Debug, Clone)]
pub struct SettlementEvent {
    pub room_id: RoomId,
    pub title: String,
    pub chat: Option<ChatRef>,
    pub winning_side: Side,
    pub settle_price: Option<Price>,
    pub target: Price,
    pub total_pool: Decimal,
    pub payout_pool: Decimal,
    pub trigger: SettleTrigger,
    pub participants: Vec<ParticipantOutcome>,
}

impl SettlementEvent {
    /// Build the event from a settled plan. `external_ref` maps users to
    /// their chat identity.
    pub fn from_plan(
        room: &Room,
        plan: &SettlementPlan,
        settle_price: Option<Price>,
        trigger: SettleTrigger,
        external_ref: impl Fn(&UserId) -> Option<String>,
    ) -> Self {
        Self {
            room_id: room.id.clone(),
            title: room.title.clone(),
            chat: room.chat.clone(),
            winning_side: plan.winning_side,
            settle_price,
            target: room.target,
            total_pool: plan.total_pool,
            payout_pool: plan.payout_pool,
            trigger,
            participants: plan
                .payouts
                .iter()
                .map(|p| ParticipantOutcome {
                    user_id: p.user_id.clone(),
                    external_ref: external_ref(&p.user_id),
                    side: p.side,
                    amount: p.amount,
                    won: p.won,
                    payout: p.payout,
                })
                .collect(),
        }
    }

    /// Number of winning bets.
    #[must_use]
    pub fn winners(&self) -> usize {
        self.participants.iter().filter(|p| p.won).count()
    }
}

/// Trait for notification handlers.
///
/// Implement this trait to receive events from the system.
/// Notifications are fire-and-forget (async but not awaited).
///
/// # Implementation Notes
///
/// - Implementations must be thread-safe (`Send + Sync`)
/// - The `notify` method should not block or perform slow I/O synchronously
/// - Consider spawning async tasks for slow operations
pub trait Notifier: Send + Sync {
    /// Handle an event.
    ///
    /// This method should return quickly. For slow operations (e.g., HTTP calls),
    /// implementations should spawn an async task.
    fn notify(&self, event: Event);
}

/// Registry of notifiers (composite pattern).
///
/// Broadcasts events to all registered notifiers.
pub struct NotifierRegistry {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notifiers: vec![] }
    }

    /// Register a notifier.
    pub fn register(&mut self, notifier: Box<dyn Notifier>) {
        self.notifiers.push(notifier);
    }

    /// Notify all registered notifiers.
    pub fn notify_all(&self, event: Event) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }
}

impl Default for NotifierRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A no-op notifier for testing or when notifications are disabled.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: Event) {}
}

/// A logging notifier that logs events via tracing.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: Event) {
        use tracing::{error, info, warn};
        match event {
            Event::RoomSettled(e) => {
                info!(
                    room_id = %e.room_id,
                    winning_side = %e.winning_side,
                    trigger = e.trigger.as_str(),
                    total_pool = %e.total_pool,
                    winners = e.winners(),
                    "Room settled"
                );
            }
            Event::RoomLocked {
                room_id,
                lock_price,
                ..
            } => {
                info!(
                    room_id = %room_id,
                    lock_price = ?lock_price,
                    "Room locked"
                );
            }
            Event::ManualResolutionRequired { room_id, reason, .. } => {
                warn!(room_id = %room_id, reason = %reason, "Manual resolution required");
            }
            Event::ChatPoolExhausted { room_id, .. } => {
                warn!(room_id = %room_id, "Chat pool exhausted");
            }
            Event::InvariantViolation { room_id, details } => {
                error!(room_id = %room_id, details = %details, "Invariant violation");
            }
        }
    }
}
