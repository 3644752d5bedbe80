//! SQLite ledger store implementation.
//!
//! Balance changes are SQL-side increments paired with a transaction row in
//! the same database transaction. Debits are conditional on sufficient funds.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;

use super::database::connection::{encode_time, with_conn, DbPool};
use super::database::model::{TransactionRow, UserRow};
use super::database::schema::{transactions, users};
use crate::domain::money::{ensure_positive, from_atoms, to_atoms};
use crate::domain::{
    Amount, DomainError, LedgerEntry, ReferralStats, RoomId, TransactionKind, User, UserId,
};
use crate::error::Result;
use crate::port::outbound::store::{LedgerStore, Page};

/// Credit `atoms` to a user and record the entry.
pub(super) fn credit(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    atoms: i64,
    kind: TransactionKind,
    room_id: Option<&RoomId>,
    memo: Option<&str>,
    at: &str,
) -> Result<TransactionRow> {
    let updated = diesel::update(users::table.find(user_id.as_str()))
        .set(users::balance.eq(users::balance + atoms))
        .execute(conn)?;
    if updated == 0 {
        return Err(DomainError::UserNotFound.into());
    }
    record(conn, user_id, atoms, kind, room_id, memo, at)
}

/// Debit `atoms` from a user if the balance covers it, and record the entry.
pub(super) fn debit(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    atoms: i64,
    kind: TransactionKind,
    room_id: Option<&RoomId>,
    memo: Option<&str>,
    at: &str,
) -> Result<TransactionRow> {
    let updated = diesel::update(
        users::table
            .find(user_id.as_str())
            .filter(users::balance.ge(atoms)),
    )
    .set(users::balance.eq(users::balance - atoms))
    .execute(conn)?;
    if updated == 0 {
        let exists: i64 = users::table
            .find(user_id.as_str())
            .count()
            .get_result(conn)?;
        return Err(if exists == 0 {
            DomainError::UserNotFound
        } else {
            DomainError::InsufficientBalance
        }
        .into());
    }
    record(conn, user_id, atoms, kind, room_id, memo, at)
}

fn record(
    conn: &mut SqliteConnection,
    user_id: &UserId,
    atoms: i64,
    kind: TransactionKind,
    room_id: Option<&RoomId>,
    memo: Option<&str>,
    at: &str,
) -> Result<TransactionRow> {
    let row = TransactionRow::new(user_id, kind, atoms, room_id, memo, at);
    diesel::insert_into(transactions::table)
        .values(&row)
        .execute(conn)?;
    Ok(row)
}

/// SQLite-backed ledger store.
#[derive(Clone)]
pub struct SqliteLedgerStore {
    pool: DbPool,
}

impl SqliteLedgerStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn find_user<F>(&self, filter: F) -> Result<Option<User>>
    where
        F: FnOnce(&mut SqliteConnection) -> QueryResult<Option<UserRow>> + Send + 'static,
    {
        with_conn(&self.pool, move |conn| {
            filter(conn)?.map(UserRow::into_user).transpose()
        })
        .await
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn insert_user(&self, user: &User) -> Result<()> {
        let row = UserRow::from_user(user)?;
        with_conn(&self.pool, move |conn| {
            diesel::insert_into(users::table).values(&row).execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn user(&self, id: &UserId) -> Result<Option<User>> {
        let id = id.to_string();
        self.find_user(move |conn| {
            users::table
                .find(&id)
                .select(UserRow::as_select())
                .first(conn)
                .optional()
        })
        .await
    }

    async fn user_by_external_ref(&self, external_ref: &str) -> Result<Option<User>> {
        let external_ref = external_ref.to_string();
        self.find_user(move |conn| {
            users::table
                .filter(users::external_ref.eq(&external_ref))
                .select(UserRow::as_select())
                .first(conn)
                .optional()
        })
        .await
    }

    async fn user_by_referral_code(&self, code: &str) -> Result<Option<User>> {
        let code = code.trim().to_ascii_uppercase();
        self.find_user(move |conn| {
            users::table
                .filter(users::referral_code.eq(&code))
                .select(UserRow::as_select())
                .first(conn)
                .optional()
        })
        .await
    }

    async fn deposit(
        &self,
        id: &UserId,
        amount: Amount,
        memo: Option<&str>,
    ) -> Result<LedgerEntry> {
        let atoms = to_atoms(ensure_positive(amount)?)?;
        let id = id.clone();
        let memo = memo.map(str::to_string);
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let row = credit(
                    conn,
                    &id,
                    atoms,
                    TransactionKind::Deposit,
                    None,
                    memo.as_deref(),
                    &encode_time(Utc::now()),
                )?;
                diesel::update(users::table.find(id.as_str()))
                    .set(users::total_deposited.eq(users::total_deposited + atoms))
                    .execute(conn)?;
                row.into_entry()
            })
        })
        .await
    }

    async fn withdraw(
        &self,
        id: &UserId,
        amount: Amount,
        memo: Option<&str>,
    ) -> Result<LedgerEntry> {
        let atoms = to_atoms(ensure_positive(amount)?)?;
        let id = id.clone();
        let memo = memo.map(str::to_string);
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let row = debit(
                    conn,
                    &id,
                    atoms,
                    TransactionKind::Withdraw,
                    None,
                    memo.as_deref(),
                    &encode_time(Utc::now()),
                )?;
                diesel::update(users::table.find(id.as_str()))
                    .set(users::total_withdrawn.eq(users::total_withdrawn + atoms))
                    .execute(conn)?;
                row.into_entry()
            })
        })
        .await
    }

    async fn referral_stats(&self, id: &UserId) -> Result<ReferralStats> {
        let id = id.to_string();
        with_conn(&self.pool, move |conn| {
            let referral_code: String = users::table
                .find(&id)
                .select(users::referral_code)
                .first(conn)
                .optional()?
                .ok_or(DomainError::UserNotFound)?;
            let referred: i64 = users::table
                .filter(users::referred_by.eq(&referral_code))
                .count()
                .get_result(conn)?;
            let rewards: Vec<i64> = transactions::table
                .filter(transactions::user_id.eq(&id))
                .filter(transactions::kind.eq(TransactionKind::ReferralReward.as_str()))
                .select(transactions::amount)
                .load(conn)?;
            let rewarded = rewards
                .iter()
                .fold(0_i64, |sum, atoms| sum.saturating_add(*atoms));
            Ok(ReferralStats {
                referral_code,
                referred_count: usize::try_from(referred).unwrap_or_default(),
                total_rewards: from_atoms(rewarded),
            })
        })
        .await
    }

    async fn transactions(
        &self,
        id: &UserId,
        page: usize,
        page_size: usize,
    ) -> Result<Page<LedgerEntry>> {
        let id = id.to_string();
        with_conn(&self.pool, move |conn| {
            let total: i64 = transactions::table
                .filter(transactions::user_id.eq(&id))
                .count()
                .get_result(conn)?;
            let limit = i64::try_from(page_size).unwrap_or(i64::MAX);
            let offset = i64::try_from(page.saturating_mul(page_size)).unwrap_or(i64::MAX);
            let items = transactions::table
                .filter(transactions::user_id.eq(&id))
                .order((transactions::created_at.desc(), transactions::id.desc()))
                .limit(limit)
                .offset(offset)
                .select(TransactionRow::as_select())
                .load(conn)?
                .into_iter()
                .map(TransactionRow::into_entry)
                .collect::<Result<Vec<_>>>()?;
            Ok(Page {
                items,
                page,
                page_size,
                total: usize::try_from(total).unwrap_or_default(),
            })
        })
        .await
    }
}
