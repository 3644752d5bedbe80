//! SQLite room store implementation.
//!
//! Wager placement, launch, lock and settlement each run in a single
//! `BEGIN IMMEDIATE` transaction. SQLite allows one writer at a time, so two
//! writers racing on the same room are serialised, and every status change is
//! additionally guarded by a `WHERE status = <expected>` clause whose
//! affected-row count decides the winner.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::count_distinct;
use diesel::prelude::*;
use diesel::sqlite::Sqlite;
use diesel::SqliteConnection;
use tracing::debug;

use super::database::connection::{encode_time, with_conn, DbPool};
use super::database::model::{BetRow, RoomRow};
use super::database::schema::{bets, rooms, users};
use super::ledger_store::{credit, debit};
use crate::domain::money::{from_atoms, to_atoms};
use crate::domain::{
    Bet, BetFilter, BetId, BetStatus, BetTotals, ChatRef, DomainError, MarketKind, PlayerBet,
    Price, Room, RoomId, RoomStatus, Side, TransactionKind, UserId, WagerStage,
};
use crate::error::{Error, Result};
use crate::port::outbound::store::{
    Page, RoomStore, SettleOutcome, SettleRequest, SettlementReceipt, Wager,
};

/// SQLite-backed room store.
#[derive(Clone)]
pub struct SqliteRoomStore {
    pool: DbPool,
}

impl SqliteRoomStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn load_room(conn: &mut SqliteConnection, id: &str) -> Result<Option<Room>> {
    rooms::table
        .find(id)
        .select(RoomRow::as_select())
        .first(conn)
        .optional()?
        .map(RoomRow::into_room)
        .transpose()
}

fn load_rooms(rows: Vec<RoomRow>) -> Result<Vec<Room>> {
    rows.into_iter().map(RoomRow::into_room).collect()
}

/// One player's bets narrowed by `filter`.
fn user_bets(user_id: &str, filter: BetFilter) -> bets::BoxedQuery<'_, Sqlite> {
    let query = bets::table
        .filter(bets::user_id.eq(user_id))
        .into_boxed::<Sqlite>();
    match filter {
        BetFilter::All => query,
        BetFilter::Open => query.filter(bets::settled.eq(false)),
        BetFilter::Settled => query.filter(bets::settled.eq(true)),
        BetFilter::Won => query
            .filter(bets::settled.eq(true))
            .filter(bets::won.eq(Some(true))),
    }
}

fn place_bet_tx(conn: &mut SqliteConnection, wager: &Wager) -> Result<Bet> {
    let room = load_room(conn, wager.room_id.as_str())?.ok_or(DomainError::RoomNotFound)?;
    let balance: i64 = users::table
        .find(wager.user_id.as_str())
        .select(users::balance)
        .first(conn)
        .optional()?
        .ok_or(DomainError::UserNotFound)?;
    let already_in_room = bets::table
        .filter(bets::room_id.eq(room.id.as_str()))
        .filter(bets::user_id.eq(wager.user_id.as_str()))
        .count()
        .get_result::<i64>(conn)?
        > 0;

    room.admit(
        wager.stage,
        wager.amount,
        from_atoms(balance),
        already_in_room,
    )?;

    let atoms = to_atoms(wager.amount)?;
    let now = Utc::now();
    debit(
        conn,
        &wager.user_id,
        atoms,
        TransactionKind::Bet,
        Some(&room.id),
        Some(wager.side.as_str()),
        &encode_time(now),
    )?;

    let bet = Bet {
        id: BetId::new(),
        room_id: room.id.clone(),
        user_id: wager.user_id.clone(),
        side: wager.side,
        amount: wager.amount,
        status: match wager.stage {
            WagerStage::Open => BetStatus::Active,
            WagerStage::Queue => BetStatus::Queued,
        },
        settled: false,
        won: None,
        payout: rust_decimal::Decimal::ZERO,
        created_at: now,
    };
    diesel::insert_into(bets::table)
        .values(&BetRow::from_bet(&bet)?)
        .execute(conn)?;

    // Recount rather than increment so concurrent placements stay correct.
    let players: i64 = bets::table
        .filter(bets::room_id.eq(room.id.as_str()))
        .select(count_distinct(bets::user_id))
        .first(conn)?;
    let players = i32::try_from(players)
        .map_err(|_| Error::Database(format!("player count overflow: {players}")))?;

    let target = rooms::table.find(room.id.as_str());
    match wager.side {
        Side::Yes => diesel::update(target)
            .set((
                rooms::current_players.eq(players),
                rooms::total_pool.eq(rooms::total_pool + atoms),
                rooms::yes_pool.eq(rooms::yes_pool + atoms),
            ))
            .execute(conn)?,
        Side::No => diesel::update(target)
            .set((
                rooms::current_players.eq(players),
                rooms::total_pool.eq(rooms::total_pool + atoms),
                rooms::no_pool.eq(rooms::no_pool + atoms),
            ))
            .execute(conn)?,
    };

    Ok(bet)
}

fn settle_tx(conn: &mut SqliteConnection, request: &SettleRequest) -> Result<SettleOutcome> {
    let plan = &request.plan;
    let room_id = plan.room_id.as_str();
    let now = encode_time(request.settled_at);

    let claimed = diesel::update(
        rooms::table
            .find(room_id)
            .filter(rooms::status.eq(RoomStatus::Locked.as_str())),
    )
    .set((
        rooms::status.eq(RoomStatus::Settled.as_str()),
        rooms::winning_side.eq(Some(plan.winning_side.as_str())),
        rooms::settle_price.eq(request.settle_price.map(|p| p.to_string())),
        rooms::settled_at.eq(Some(&now)),
        rooms::protocol_fee.eq(to_atoms(plan.protocol_fee)?),
        rooms::host_fee.eq(to_atoms(plan.host_fee)?),
    ))
    .execute(conn)?;

    if claimed == 0 {
        let status: Option<String> = rooms::table
            .find(room_id)
            .select(rooms::status)
            .first(conn)
            .optional()?;
        return match status.as_deref() {
            Some("SETTLED") => Ok(SettleOutcome::AlreadySettled),
            Some(_) => Err(DomainError::RoomNotLocked.into()),
            None => Err(DomainError::RoomNotFound.into()),
        };
    }

    let (total, yes, no, creator): (i64, i64, i64, Option<String>) = rooms::table
        .find(room_id)
        .select((
            rooms::total_pool,
            rooms::yes_pool,
            rooms::no_pool,
            rooms::creator_id,
        ))
        .first(conn)?;
    if from_atoms(total) != plan.total_pool {
        return Err(DomainError::PoolMismatch {
            total: from_atoms(total),
            yes: from_atoms(yes),
            no: from_atoms(no),
            bets: plan.payouts.iter().map(|p| p.amount).sum(),
        }
        .into());
    }

    let mut receipt = SettlementReceipt::default();
    for entry in &plan.payouts {
        let payout = to_atoms(entry.payout)?;
        let updated = diesel::update(
            bets::table
                .find(entry.bet_id.as_str())
                .filter(bets::room_id.eq(room_id))
                .filter(bets::settled.eq(false)),
        )
        .set((
            bets::settled.eq(true),
            bets::won.eq(Some(entry.won)),
            bets::payout.eq(payout),
        ))
        .execute(conn)?;
        if updated == 0 {
            return Err(Error::Database(format!(
                "bet {} missing or already settled",
                entry.bet_id
            )));
        }
        if payout == 0 {
            continue;
        }

        credit(
            conn,
            &entry.user_id,
            payout,
            TransactionKind::Win,
            Some(&plan.room_id),
            None,
            &now,
        )?;
        receipt.winnings.push((entry.user_id.clone(), entry.payout));

        if let Some(referrer) = referrer_of(conn, &entry.user_id)? {
            let reward = plan.fees.referral_reward(entry.payout);
            let reward_atoms = to_atoms(reward)?;
            if reward_atoms > 0 {
                credit(
                    conn,
                    &referrer,
                    reward_atoms,
                    TransactionKind::ReferralReward,
                    Some(&plan.room_id),
                    Some(entry.user_id.as_str()),
                    &now,
                )?;
                receipt.referral_rewards.push((referrer, reward));
            }
        }
    }

    let unsettled: i64 = bets::table
        .filter(bets::room_id.eq(room_id))
        .filter(bets::settled.eq(false))
        .count()
        .get_result(conn)?;
    if unsettled > 0 {
        return Err(Error::Database(format!(
            "{unsettled} bets in room {room_id} are missing from the settlement plan"
        )));
    }

    let host_atoms = to_atoms(plan.host_fee)?;
    if let Some(creator) = creator.filter(|_| plan.has_winners() && host_atoms > 0) {
        let creator = UserId::from(creator);
        credit(
            conn,
            &creator,
            host_atoms,
            TransactionKind::Fee,
            Some(&plan.room_id),
            Some("host fee"),
            &now,
        )?;
        receipt.host_fee = Some((creator, plan.host_fee));
    }

    Ok(SettleOutcome::Settled(receipt))
}

fn referrer_of(conn: &mut SqliteConnection, user_id: &UserId) -> Result<Option<UserId>> {
    let code: Option<String> = users::table
        .find(user_id.as_str())
        .select(users::referred_by)
        .first(conn)?;
    let Some(code) = code else {
        return Ok(None);
    };
    let referrer: Option<String> = users::table
        .filter(users::referral_code.eq(&code))
        .select(users::id)
        .first(conn)
        .optional()?;
    Ok(referrer
        .filter(|id| id != user_id.as_str())
        .map(UserId::from))
}

#[async_trait]
impl RoomStore for SqliteRoomStore {
    async fn insert_room(&self, room: &Room) -> Result<()> {
        let row = RoomRow::from_room(room)?;
        with_conn(&self.pool, move |conn| {
            diesel::insert_into(rooms::table).values(&row).execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn room(&self, id: &RoomId) -> Result<Option<Room>> {
        let id = id.to_string();
        with_conn(&self.pool, move |conn| load_room(conn, &id)).await
    }

    async fn room_by_chat(&self, chat: &ChatRef) -> Result<Option<Room>> {
        let chat = chat.to_string();
        with_conn(&self.pool, move |conn| {
            rooms::table
                .filter(rooms::chat_id.eq(&chat))
                .filter(rooms::status.ne(RoomStatus::Settled.as_str()))
                .select(RoomRow::as_select())
                .first(conn)
                .optional()?
                .map(RoomRow::into_room)
                .transpose()
        })
        .await
    }

    async fn list_rooms(
        &self,
        status: Option<RoomStatus>,
        page: usize,
        page_size: usize,
    ) -> Result<Page<Room>> {
        with_conn(&self.pool, move |conn| {
            let filtered = || {
                let mut query = rooms::table.into_boxed::<Sqlite>();
                if let Some(status) = status {
                    query = query.filter(rooms::status.eq(status.as_str()));
                }
                query
            };

            let total: i64 = filtered().count().get_result(conn)?;
            let limit = i64::try_from(page_size).unwrap_or(i64::MAX);
            let offset = i64::try_from(page.saturating_mul(page_size)).unwrap_or(i64::MAX);
            let rows = filtered()
                .order((rooms::created_at.desc(), rooms::id.asc()))
                .limit(limit)
                .offset(offset)
                .select(RoomRow::as_select())
                .load(conn)?;

            Ok(Page {
                items: load_rooms(rows)?,
                page,
                page_size,
                total: usize::try_from(total).unwrap_or_default(),
            })
        })
        .await
    }

    async fn rooms_to_lock(&self, now: DateTime<Utc>) -> Result<Vec<Room>> {
        let now = encode_time(now);
        with_conn(&self.pool, move |conn| {
            let rows = rooms::table
                .filter(rooms::status.eq(RoomStatus::Open.as_str()))
                .filter(rooms::lock_at.le(&now).or(rooms::settle_at.le(&now)))
                .order(rooms::lock_at.asc())
                .select(RoomRow::as_select())
                .load(conn)?;
            load_rooms(rows)
        })
        .await
    }

    async fn rooms_due(&self, now: DateTime<Utc>) -> Result<Vec<Room>> {
        let now = encode_time(now);
        with_conn(&self.pool, move |conn| {
            let rows = rooms::table
                .filter(rooms::status.eq_any([RoomStatus::Open.as_str(), RoomStatus::Locked.as_str()]))
                .filter(rooms::settle_at.le(&now))
                .order(rooms::settle_at.asc())
                .select(RoomRow::as_select())
                .load(conn)?;
            load_rooms(rows)
        })
        .await
    }

    async fn open_threshold_rooms(&self) -> Result<Vec<Room>> {
        with_conn(&self.pool, move |conn| {
            let rows = rooms::table
                .filter(rooms::status.eq(RoomStatus::Open.as_str()))
                .filter(rooms::market_kind.ne(MarketKind::Custom.label()))
                .order(rooms::settle_at.asc())
                .select(RoomRow::as_select())
                .load(conn)?;
            load_rooms(rows)
        })
        .await
    }

    async fn manual_queue(&self, now: DateTime<Utc>) -> Result<Vec<Room>> {
        let now = encode_time(now);
        with_conn(&self.pool, move |conn| {
            let rows = rooms::table
                .filter(rooms::status.eq(RoomStatus::Locked.as_str()))
                .filter(rooms::settle_at.le(&now))
                .order(rooms::settle_at.asc())
                .select(RoomRow::as_select())
                .load(conn)?;
            load_rooms(rows)
        })
        .await
    }

    async fn bets(&self, room_id: &RoomId) -> Result<Vec<Bet>> {
        let room_id = room_id.to_string();
        with_conn(&self.pool, move |conn| {
            bets::table
                .filter(bets::room_id.eq(&room_id))
                .order((bets::created_at.asc(), bets::id.asc()))
                .select(BetRow::as_select())
                .load(conn)?
                .into_iter()
                .map(BetRow::into_bet)
                .collect()
        })
        .await
    }

    async fn bets_for_user(
        &self,
        user_id: &UserId,
        filter: BetFilter,
        page: usize,
        page_size: usize,
    ) -> Result<Page<PlayerBet>> {
        let user_id = user_id.to_string();
        with_conn(&self.pool, move |conn| {
            let total: i64 = user_bets(&user_id, filter).count().get_result(conn)?;
            let limit = i64::try_from(page_size).unwrap_or(i64::MAX);
            let offset = i64::try_from(page.saturating_mul(page_size)).unwrap_or(i64::MAX);
            let rows = user_bets(&user_id, filter)
                .order((bets::created_at.desc(), bets::id.desc()))
                .limit(limit)
                .offset(offset)
                .select(BetRow::as_select())
                .load(conn)?;

            let room_ids: Vec<&str> = rows.iter().map(|row| row.room_id.as_str()).collect();
            let titles: HashMap<String, String> = rooms::table
                .filter(rooms::id.eq_any(room_ids))
                .select((rooms::id, rooms::title))
                .load::<(String, String)>(conn)?
                .into_iter()
                .collect();

            let items = rows
                .into_iter()
                .map(|row| -> Result<PlayerBet> {
                    let room_title = titles.get(&row.room_id).cloned().unwrap_or_default();
                    Ok(PlayerBet {
                        bet: row.into_bet()?,
                        room_title,
                    })
                })
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

    async fn bet_totals(&self, user_id: &UserId, filter: BetFilter) -> Result<BetTotals> {
        let user_id = user_id.to_string();
        with_conn(&self.pool, move |conn| {
            let amounts: Vec<(i64, i64)> = user_bets(&user_id, filter)
                .select((bets::amount, bets::payout))
                .load(conn)?;
            let (staked, payout) = amounts
                .iter()
                .fold((0_i64, 0_i64), |(s, p), (amount, paid)| {
                    (s.saturating_add(*amount), p.saturating_add(*paid))
                });
            Ok(BetTotals {
                count: amounts.len(),
                staked: from_atoms(staked),
                payout: from_atoms(payout),
            })
        })
        .await
    }

    async fn has_active_bet(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool> {
        let room_id = room_id.to_string();
        let user_id = user_id.to_string();
        with_conn(&self.pool, move |conn| {
            let count: i64 = bets::table
                .filter(bets::room_id.eq(&room_id))
                .filter(bets::user_id.eq(&user_id))
                .filter(bets::status.eq(BetStatus::Active.as_str()))
                .count()
                .get_result(conn)?;
            Ok(count > 0)
        })
        .await
    }

    async fn place_bet(&self, wager: &Wager) -> Result<Bet> {
        let wager = wager.clone();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| place_bet_tx(conn, &wager))
        })
        .await
    }

    async fn launch_room(&self, id: &RoomId) -> Result<bool> {
        let id = id.to_string();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| {
                let launched = diesel::update(
                    rooms::table
                        .find(&id)
                        .filter(rooms::status.eq(RoomStatus::Queuing.as_str())),
                )
                .set(rooms::status.eq(RoomStatus::Open.as_str()))
                .execute(conn)?;
                if launched == 0 {
                    return Ok(false);
                }
                let activated = diesel::update(
                    bets::table
                        .filter(bets::room_id.eq(&id))
                        .filter(bets::status.eq(BetStatus::Queued.as_str())),
                )
                .set(bets::status.eq(BetStatus::Active.as_str()))
                .execute(conn)?;
                debug!(room_id = %id, activated, "Queued bets activated");
                Ok(true)
            })
        })
        .await
    }

    async fn lock_room(
        &self,
        id: &RoomId,
        lock_price: Option<Price>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let id = id.to_string();
        let now = encode_time(now);
        with_conn(&self.pool, move |conn| {
            let locked = diesel::update(
                rooms::table
                    .find(&id)
                    .filter(rooms::status.eq(RoomStatus::Open.as_str())),
            )
            .set((
                rooms::status.eq(RoomStatus::Locked.as_str()),
                rooms::lock_price.eq(lock_price.map(|p| p.to_string())),
                rooms::locked_at.eq(Some(&now)),
            ))
            .execute(conn)?;
            Ok(locked == 1)
        })
        .await
    }

    async fn settle_room(&self, request: &SettleRequest) -> Result<SettleOutcome> {
        let request = request.clone();
        with_conn(&self.pool, move |conn| {
            conn.immediate_transaction(|conn| settle_tx(conn, &request))
        })
        .await
    }

    async fn set_room_chat(
        &self,
        id: &RoomId,
        chat: Option<&ChatRef>,
        invite_link: Option<&str>,
    ) -> Result<()> {
        let id = id.to_string();
        let chat = chat.map(ToString::to_string);
        let invite_link = invite_link.map(str::to_string);
        with_conn(&self.pool, move |conn| {
            diesel::update(rooms::table.find(&id))
                .set((rooms::chat_id.eq(chat), rooms::invite_link.eq(invite_link)))
                .execute(conn)?;
            Ok(())
        })
        .await
    }
}
