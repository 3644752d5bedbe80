//! Append-only ledger records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{RoomId, TransactionId, UserId};
use super::money::Amount;

/// Reason for a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Bet,
    Win,
    ReferralReward,
    Fee,
}

impl TransactionKind {
    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdraw => "WITHDRAW",
            Self::Bet => "BET",
            Self::Win => "WIN",
            Self::ReferralReward => "REFERRAL_REWARD",
            Self::Fee => "FEE",
        }
    }

    /// Whether the entry adds to the balance.
    #[must_use]
    pub const fn is_credit(self) -> bool {
        !matches!(self, Self::Withdraw | Self::Bet)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAW" => Ok(Self::Withdraw),
            "BET" => Ok(Self::Bet),
            "WIN" => Ok(Self::Win),
            "REFERRAL_REWARD" => Ok(Self::ReferralReward),
            "FEE" => Ok(Self::Fee),
            other => Err(format!("unknown transaction kind '{other}'")),
        }
    }
}

/// An immutable record of one balance change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: TransactionId,
    pub user_id: UserId,
    pub kind: TransactionKind,
    /// Always positive; direction comes from `kind`.
    pub amount: Amount,
    pub room_id: Option<RoomId>,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Amount with sign applied.
    #[must_use]
    pub fn signed_amount(&self) -> Amount {
        if self.kind.is_credit() {
            self.amount
        } else {
            -self.amount
        }
    }
}
