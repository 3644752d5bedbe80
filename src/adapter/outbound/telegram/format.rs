//! Message formatting for Telegram notifications.
//!
//! Every function here is pure; the notifier worker only sends what
//! [`outgoing_messages`] returns.

use rust_decimal::Decimal;

use crate::domain::{ChatRef, Price};
use crate::port::outbound::notifier::{Event, ParticipantOutcome, SettlementEvent};

/// A message addressed to one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub chat_id: i64,
    pub text: String,
}

/// Expand an event into the messages it produces.
///
/// Settlements go to the room chat and to each participant with a known
/// chat identity. Operator alerts go to the admin chat.
pub fn outgoing_messages(event: &Event, admin_chat: Option<i64>) -> Vec<Outgoing> {
    let mut out = Vec::new();
    match event {
        Event::RoomSettled(e) => {
            if let Some(chat_id) = e.chat.as_ref().and_then(chat_id) {
                out.push(Outgoing {
                    chat_id,
                    text: format_room_summary(e),
                });
            }
            for participant in &e.participants {
                let Some(chat_id) = participant
                    .external_ref
                    .as_deref()
                    .and_then(|r| r.parse().ok())
                else {
                    continue;
                };
                out.push(Outgoing {
                    chat_id,
                    text: format_participant(e, participant),
                });
            }
        }
        Event::RoomLocked {
            title,
            chat,
            lock_price,
            ..
        } => {
            if let Some(chat_id) = chat.as_ref().and_then(chat_id) {
                out.push(Outgoing {
                    chat_id,
                    text: format_locked(title, *lock_price),
                });
            }
        }
        other => {
            if let (Some(chat_id), Some(text)) = (admin_chat, format_admin_alert(other)) {
                out.push(Outgoing { chat_id, text });
            }
        }
    }
    out
}

/// Parse a stored chat reference as a Telegram chat id.
pub fn chat_id(chat: &ChatRef) -> Option<i64> {
    chat.as_str().parse().ok()
}

pub fn format_room_summary(e: &SettlementEvent) -> String {
    let price = e
        .settle_price
        .map_or_else(|| "n/a".to_string(), amount);
    format!(
        "🏁 *Room settled: {}*\n\
        \n\
        🏆 Winner: `{}`\n\
        🎯 Target: `{}`\n\
        📈 Final value: `{}`\n\
        💰 Pool: `{}`\n\
        👥 Winners: `{}` of `{}`",
        escape_markdown(&truncate(&e.title, 60)),
        e.winning_side,
        escape_markdown(&amount(e.target)),
        escape_markdown(&price),
        escape_markdown(&amount(e.total_pool)),
        e.winners(),
        e.participants.len()
    )
}

pub fn format_participant(e: &SettlementEvent, p: &ParticipantOutcome) -> String {
    let title = escape_markdown(&truncate(&e.title, 60));
    if p.won {
        format!(
            "✅ *You won: {}*\n\
            \n\
            🎲 Bet: `{}` on `{}`\n\
            💵 Payout: `{}`\n\
            📈 Profit: `{}`",
            title,
            escape_markdown(&amount(p.amount)),
            p.side,
            escape_markdown(&amount(p.payout)),
            escape_markdown(&amount(p.profit()))
        )
    } else {
        format!(
            "❌ *You lost: {}*\n\
            \n\
            🎲 Bet: `{}` on `{}`\n\
            🏆 Winner: `{}`",
            title,
            escape_markdown(&amount(p.amount)),
            p.side,
            e.winning_side
        )
    }
}

pub fn format_locked(title: &str, lock_price: Option<Price>) -> String {
    let mut msg = format!(
        "🔒 *Betting closed: {}*",
        escape_markdown(&truncate(title, 60))
    );
    if let Some(price) = lock_price {
        msg.push_str(&format!(
            "\n\n📸 Lock value: `{}`",
            escape_markdown(&amount(price))
        ));
    }
    msg
}

/// Operator alert text, or None for events that are not alerts.
pub fn format_admin_alert(event: &Event) -> Option<String> {
    match event {
        Event::ManualResolutionRequired {
            room_id,
            title,
            reason,
        } => Some(format!(
            "⚠️ *Manual resolution required*\n\
            \n\
            📋 {}\n\
            🆔 `{}`\n\
            ❓ {}",
            escape_markdown(&truncate(title, 60)),
            escape_markdown(room_id.as_str()),
            escape_markdown(reason)
        )),
        Event::ChatPoolExhausted { room_id, title } => Some(format!(
            "🚫 *Chat pool exhausted*\n\
            \n\
            📋 {}\n\
            🆔 `{}`",
            escape_markdown(&truncate(title, 60)),
            escape_markdown(room_id.as_str())
        )),
        Event::InvariantViolation { room_id, details } => Some(format!(
            "🛑 *Invariant violation*\n\
            \n\
            🆔 `{}`\n\
            {}",
            escape_markdown(room_id.as_str()),
            escape_markdown(details)
        )),
        Event::RoomSettled(_) | Event::RoomLocked { .. } => None,
    }
}

fn amount(value: Decimal) -> String {
    value.normalize().to_string()
}

/// Truncate a string with ellipsis (Unicode-safe).
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Escape special characters for Telegram `MarkdownV2`.
pub fn escape_markdown(text: &str) -> String {
    const SPECIAL: [char; 18] = [
        '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    ];
    let mut result = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            result.push('\\');
        }
        result.push(c);
    }
    result
}
