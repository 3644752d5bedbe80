//! Account holders.

use chrono::{DateTime, Utc};
use rand::distributions::Uniform;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::money::Amount;

const REFERRAL_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const REFERRAL_CODE_LEN: usize = 8;

/// An account holder.
///
/// `custody_blob` is opaque encrypted key material produced by the custody
/// service; the core never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Identity on the inbound surface (e.g. Telegram user id).
    pub external_ref: String,
    pub username: Option<String>,
    pub balance: Amount,
    pub total_deposited: Amount,
    pub total_withdrawn: Amount,
    pub custody_handle: Option<String>,
    #[serde(skip_serializing)]
    pub custody_blob: Option<String>,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// What a user's referral code has brought in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralStats {
    pub referral_code: String,
    /// Users who signed up with the code.
    pub referred_count: usize,
    /// Sum of `REFERRAL_REWARD` credits.
    pub total_rewards: Amount,
}

/// Generate a fresh referral code.
#[must_use]
pub fn generate_referral_code() -> String {
    let mut rng = rand::thread_rng();
    let dist = Uniform::from(0..REFERRAL_ALPHABET.len());
    (0..REFERRAL_CODE_LEN)
        .map(|_| char::from(REFERRAL_ALPHABET[rng.sample(dist)]))
        .collect()
}
