//! User accounts and balances.
//!
//! New users receive a custody credential; only the public handle and the
//! encrypted blob are stored. Withdrawals decrypt the blob to confirm the
//! account's key material is intact before debiting; the on-chain transfer
//! itself happens outside this crate.
//!
//! Players can also review their own bets, wins and referral results here.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::user::generate_referral_code;
use crate::domain::{
    Amount, BetFilter, BetTotals, DomainError, LedgerEntry, PlayerBet, ReferralStats, User,
    UserId,
};
use crate::error::{Error, Result};
use crate::port::outbound::{Custody, LedgerStore, Page, RoomStore};

/// Attempts at drawing an unused referral code.
const REFERRAL_CODE_ATTEMPTS: usize = 8;

/// A page of won bets plus totals over every win.
#[derive(Debug, Clone, PartialEq)]
pub struct Winnings {
    pub page: Page<PlayerBet>,
    pub totals: BetTotals,
}

pub struct WalletService {
    ledger: Arc<dyn LedgerStore>,
    rooms: Arc<dyn RoomStore>,
    custody: Arc<dyn Custody>,
}

impl WalletService {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        rooms: Arc<dyn RoomStore>,
        custody: Arc<dyn Custody>,
    ) -> Self {
        Self {
            ledger,
            rooms,
            custody,
        }
    }

    /// Look up a user by platform reference, creating one if needed.
    ///
    /// `referral_code` links a new user to the referrer owning that code.
    /// Unknown codes and self-referrals are ignored; existing users keep
    /// their original referrer.
    pub async fn get_or_create_user(
        &self,
        external_ref: &str,
        username: Option<&str>,
        referral_code: Option<&str>,
    ) -> Result<User> {
        if let Some(user) = self.ledger.user_by_external_ref(external_ref).await? {
            return Ok(user);
        }

        let credential = self.custody.generate_credential().await?;
        let blob = self.custody.encrypt(&credential.secret).await?;

        let referred_by = match referral_code {
            Some(code) => match self.ledger.user_by_referral_code(code).await? {
                Some(referrer) if referrer.external_ref != external_ref => {
                    Some(referrer.referral_code)
                }
                Some(_) => None,
                None => {
                    debug!(code = %code, "Unknown referral code ignored");
                    None
                }
            },
            None => None,
        };

        let user = User {
            id: UserId::new(),
            external_ref: external_ref.to_string(),
            username: username.map(str::to_string),
            balance: Amount::ZERO,
            total_deposited: Amount::ZERO,
            total_withdrawn: Amount::ZERO,
            custody_handle: Some(credential.handle),
            custody_blob: Some(blob),
            referral_code: self.unused_referral_code().await?,
            referred_by,
            created_at: Utc::now(),
        };
        self.ledger.insert_user(&user).await?;
        info!(
            user_id = %user.id,
            external_ref = %user.external_ref,
            referred = user.referred_by.is_some(),
            "User created"
        );
        Ok(user)
    }

    pub async fn user(&self, user_id: &UserId) -> Result<User> {
        self.ledger
            .user(user_id)
            .await?
            .ok_or_else(|| DomainError::UserNotFound.into())
    }

    pub async fn user_by_external_ref(&self, external_ref: &str) -> Result<Option<User>> {
        self.ledger.user_by_external_ref(external_ref).await
    }

    pub async fn deposit(
        &self,
        user_id: &UserId,
        amount: Amount,
        memo: Option<&str>,
    ) -> Result<LedgerEntry> {
        let entry = self.ledger.deposit(user_id, amount, memo).await?;
        info!(user_id = %user_id, amount = %amount, "Deposit credited");
        Ok(entry)
    }

    /// Debit a withdrawal to `destination`.
    ///
    /// # Errors
    /// Returns [`DomainError::InsufficientBalance`] if the balance does not
    /// cover `amount`, or [`Error::Custody`] if the account has no usable
    /// key material.
    pub async fn withdraw(
        &self,
        user_id: &UserId,
        amount: Amount,
        destination: &str,
    ) -> Result<LedgerEntry> {
        let user = self.user(user_id).await?;
        let blob = user
            .custody_blob
            .as_deref()
            .ok_or_else(|| Error::Custody("account has no custody credential".into()))?;
        if let Err(e) = self.custody.decrypt(blob).await {
            warn!(user_id = %user_id, error = %e, "Custody credential unusable");
            return Err(e);
        }

        let memo = format!("to {destination}");
        let entry = self.ledger.withdraw(user_id, amount, Some(&memo)).await?;
        info!(user_id = %user_id, amount = %amount, destination = %destination, "Withdrawal debited");
        Ok(entry)
    }

    pub async fn balance(&self, user_id: &UserId) -> Result<Amount> {
        Ok(self.user(user_id).await?.balance)
    }

    /// Newest-first transaction history.
    pub async fn history(
        &self,
        user_id: &UserId,
        page: usize,
        page_size: usize,
    ) -> Result<Page<LedgerEntry>> {
        self.ledger
            .transactions(user_id, page, page_size.max(1))
            .await
    }

    /// The user's bets matching `filter`, newest first.
    pub async fn bets(
        &self,
        user_id: &UserId,
        filter: BetFilter,
        page: usize,
        page_size: usize,
    ) -> Result<Page<PlayerBet>> {
        self.user(user_id).await?;
        self.rooms
            .bets_for_user(user_id, filter, page, page_size.max(1))
            .await
    }

    /// Open and lifetime bet counts.
    pub async fn bet_counts(&self, user_id: &UserId) -> Result<(usize, usize)> {
        self.user(user_id).await?;
        let open = self.rooms.bet_totals(user_id, BetFilter::Open).await?;
        let all = self.rooms.bet_totals(user_id, BetFilter::All).await?;
        Ok((open.count, all.count))
    }

    /// Won bets with stake and profit, newest first.
    pub async fn winnings(
        &self,
        user_id: &UserId,
        page: usize,
        page_size: usize,
    ) -> Result<Winnings> {
        let page = self.bets(user_id, BetFilter::Won, page, page_size).await?;
        let totals = self.rooms.bet_totals(user_id, BetFilter::Won).await?;
        Ok(Winnings { page, totals })
    }

    pub async fn referral_stats(&self, user_id: &UserId) -> Result<ReferralStats> {
        self.ledger.referral_stats(user_id).await
    }

    async fn unused_referral_code(&self) -> Result<String> {
        for _ in 0..REFERRAL_CODE_ATTEMPTS {
            let code = generate_referral_code();
            if self.ledger.user_by_referral_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(Error::Parse("could not allocate a referral code".into()))
    }
}
