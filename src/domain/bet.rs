//! Wagers placed in rooms.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{BetId, RoomId, UserId};
use super::money::Amount;
use super::side::Side;

/// Placement state of a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BetStatus {
    /// Staked in a room that has not launched yet.
    Queued,
    /// Live in an open or locked room.
    Active,
}

impl BetStatus {
    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Active => "ACTIVE",
        }
    }
}

impl fmt::Display for BetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(Self::Queued),
            "ACTIVE" => Ok(Self::Active),
            other => Err(format!("unknown bet status '{other}'")),
        }
    }
}

/// One user's stake on one side of a room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: BetId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub side: Side,
    pub amount: Amount,
    pub status: BetStatus,
    pub settled: bool,
    /// `None` until the room settles.
    pub won: Option<bool>,
    /// Zero unless `won == Some(true)`.
    pub payout: Amount,
    pub created_at: DateTime<Utc>,
}

impl Bet {
    /// Net result after settlement (payout minus stake).
    #[must_use]
    pub fn profit(&self) -> Amount {
        self.payout - self.amount
    }
}

/// Which of a player's bets to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetFilter {
    #[default]
    All,
    /// Room not settled yet.
    Open,
    /// Room settled, won or lost.
    Settled,
    /// Room settled in the player's favour.
    Won,
}

impl BetFilter {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Open => "open",
            Self::Settled => "settled",
            Self::Won => "won",
        }
    }

    /// Whether `bet` belongs in this listing.
    #[must_use]
    pub fn matches(self, bet: &Bet) -> bool {
        match self {
            Self::All => true,
            Self::Open => !bet.settled,
            Self::Settled => bet.settled,
            Self::Won => bet.settled && bet.won == Some(true),
        }
    }
}

impl fmt::Display for BetFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BetFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "open" | "active" => Ok(Self::Open),
            "settled" | "history" => Ok(Self::Settled),
            "won" => Ok(Self::Won),
            other => Err(format!(
                "unknown bet filter '{other}' (expected all, open, settled or won)"
            )),
        }
    }
}

/// A bet together with the title of its room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerBet {
    #[serde(flatten)]
    pub bet: Bet,
    pub room_title: String,
}

/// Count and sums over a set of bets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetTotals {
    pub count: usize,
    pub staked: Amount,
    pub payout: Amount,
}

impl BetTotals {
    /// Sum over `bets`.
    pub fn of<'a>(bets: impl IntoIterator<Item = &'a Bet>) -> Self {
        bets.into_iter().fold(Self::default(), |acc, bet| Self {
            count: acc.count + 1,
            staked: acc.staked + bet.amount,
            payout: acc.payout + bet.payout,
        })
    }

    #[must_use]
    pub fn profit(&self) -> Amount {
        self.payout - self.staked
    }
}
