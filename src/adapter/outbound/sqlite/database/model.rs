//! Database model types for Diesel ORM.
//!
//! Money columns are integer atoms; conversion to and from domain decimals
//! happens here and nowhere else.

use std::str::FromStr;

use diesel::prelude::*;
use rust_decimal::Decimal;

use super::connection::{decode_time, encode_time};
use super::schema::{bets, chat_pool, rooms, transactions, users};
use crate::domain::money::{from_atoms, to_atoms};
use crate::domain::{
    Bet, BetId, BetStatus, ChatPoolEntry, ChatRef, ChatSlotId, ChatSlotStatus, LedgerEntry,
    MarketKind, Pools, Room, RoomId, RoomStatus, Side, TransactionId, TransactionKind, User,
    UserId,
};
use crate::error::{Error, Result};

fn parse<T: FromStr<Err = String>>(raw: &str) -> Result<T> {
    raw.parse::<T>().map_err(Error::Parse)
}

fn parse_decimal(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|e| Error::Parse(format!("bad decimal '{raw}': {e}")))
}

fn to_count(value: i32, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::Parse(format!("negative {field}: {value}")))
}

/// Database row for a room.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = rooms)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RoomRow {
    pub id: String,
    pub title: String,
    pub market_kind: String,
    pub market_ref: Option<String>,
    pub target: String,
    pub lock_at: String,
    pub settle_at: String,
    pub status: String,
    pub capacity: i32,
    pub current_players: i32,
    pub min_bet: i64,
    pub max_bet: Option<i64>,
    pub total_pool: i64,
    pub yes_pool: i64,
    pub no_pool: i64,
    pub lock_price: Option<String>,
    pub settle_price: Option<String>,
    pub winning_side: Option<String>,
    pub chat_id: Option<String>,
    pub invite_link: Option<String>,
    pub creator_id: Option<String>,
    pub protocol_fee: i64,
    pub host_fee: i64,
    pub created_at: String,
    pub locked_at: Option<String>,
    pub settled_at: Option<String>,
}

impl RoomRow {
    pub fn from_room(room: &Room) -> Result<Self> {
        Ok(Self {
            id: room.id.to_string(),
            title: room.title.clone(),
            market_kind: room.market.label().to_string(),
            market_ref: room.market.reference().map(str::to_string),
            target: room.target.to_string(),
            lock_at: encode_time(room.lock_at),
            settle_at: encode_time(room.settle_at),
            status: room.status.as_str().to_string(),
            capacity: i32::try_from(room.capacity)
                .map_err(|_| Error::Parse("capacity out of range".into()))?,
            current_players: i32::try_from(room.current_players)
                .map_err(|_| Error::Parse("player count out of range".into()))?,
            min_bet: to_atoms(room.min_bet)?,
            max_bet: room.max_bet.map(to_atoms).transpose()?,
            total_pool: to_atoms(room.pools.total)?,
            yes_pool: to_atoms(room.pools.yes)?,
            no_pool: to_atoms(room.pools.no)?,
            lock_price: room.lock_price.map(|p| p.to_string()),
            settle_price: room.settle_price.map(|p| p.to_string()),
            winning_side: room.winning_side.map(|s| s.as_str().to_string()),
            chat_id: room.chat.as_ref().map(ToString::to_string),
            invite_link: room.invite_link.clone(),
            creator_id: room.creator.as_ref().map(ToString::to_string),
            protocol_fee: to_atoms(room.protocol_fee)?,
            host_fee: to_atoms(room.host_fee)?,
            created_at: encode_time(room.created_at),
            locked_at: room.locked_at.map(encode_time),
            settled_at: room.settled_at.map(encode_time),
        })
    }

    pub fn into_room(self) -> Result<Room> {
        Ok(Room {
            market: MarketKind::from_parts(&self.market_kind, self.market_ref.as_deref())?,
            target: parse_decimal(&self.target)?,
            lock_at: decode_time(&self.lock_at)?,
            settle_at: decode_time(&self.settle_at)?,
            status: parse::<RoomStatus>(&self.status)?,
            capacity: to_count(self.capacity, "capacity")?,
            current_players: to_count(self.current_players, "current_players")?,
            min_bet: from_atoms(self.min_bet),
            max_bet: self.max_bet.map(from_atoms),
            pools: Pools {
                total: from_atoms(self.total_pool),
                yes: from_atoms(self.yes_pool),
                no: from_atoms(self.no_pool),
            },
            lock_price: self.lock_price.as_deref().map(parse_decimal).transpose()?,
            settle_price: self.settle_price.as_deref().map(parse_decimal).transpose()?,
            winning_side: self.winning_side.as_deref().map(parse::<Side>).transpose()?,
            chat: self.chat_id.map(ChatRef::from),
            invite_link: self.invite_link,
            creator: self.creator_id.map(UserId::from),
            protocol_fee: from_atoms(self.protocol_fee),
            host_fee: from_atoms(self.host_fee),
            created_at: decode_time(&self.created_at)?,
            locked_at: self.locked_at.as_deref().map(decode_time).transpose()?,
            settled_at: self.settled_at.as_deref().map(decode_time).transpose()?,
            id: RoomId::from(self.id),
            title: self.title,
        })
    }
}

/// Database row for a bet.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = bets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BetRow {
    pub id: String,
    pub room_id: String,
    pub user_id: String,
    pub side: String,
    pub amount: i64,
    pub status: String,
    pub settled: bool,
    pub won: Option<bool>,
    pub payout: i64,
    pub created_at: String,
}

impl BetRow {
    pub fn from_bet(bet: &Bet) -> Result<Self> {
        Ok(Self {
            id: bet.id.to_string(),
            room_id: bet.room_id.to_string(),
            user_id: bet.user_id.to_string(),
            side: bet.side.as_str().to_string(),
            amount: to_atoms(bet.amount)?,
            status: bet.status.as_str().to_string(),
            settled: bet.settled,
            won: bet.won,
            payout: to_atoms(bet.payout)?,
            created_at: encode_time(bet.created_at),
        })
    }

    pub fn into_bet(self) -> Result<Bet> {
        Ok(Bet {
            id: BetId::from(self.id),
            room_id: RoomId::from(self.room_id),
            user_id: UserId::from(self.user_id),
            side: parse::<Side>(&self.side)?,
            amount: from_atoms(self.amount),
            status: parse::<BetStatus>(&self.status)?,
            settled: self.settled,
            won: self.won,
            payout: from_atoms(self.payout),
            created_at: decode_time(&self.created_at)?,
        })
    }
}

/// Database row for a user.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: String,
    pub external_ref: String,
    pub username: Option<String>,
    pub balance: i64,
    pub total_deposited: i64,
    pub total_withdrawn: i64,
    pub custody_handle: Option<String>,
    pub custody_blob: Option<String>,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub created_at: String,
}

impl UserRow {
    pub fn from_user(user: &User) -> Result<Self> {
        Ok(Self {
            id: user.id.to_string(),
            external_ref: user.external_ref.clone(),
            username: user.username.clone(),
            balance: to_atoms(user.balance)?,
            total_deposited: to_atoms(user.total_deposited)?,
            total_withdrawn: to_atoms(user.total_withdrawn)?,
            custody_handle: user.custody_handle.clone(),
            custody_blob: user.custody_blob.clone(),
            referral_code: user.referral_code.clone(),
            referred_by: user.referred_by.clone(),
            created_at: encode_time(user.created_at),
        })
    }

    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: UserId::from(self.id),
            external_ref: self.external_ref,
            username: self.username,
            balance: from_atoms(self.balance),
            total_deposited: from_atoms(self.total_deposited),
            total_withdrawn: from_atoms(self.total_withdrawn),
            custody_handle: self.custody_handle,
            custody_blob: self.custody_blob,
            referral_code: self.referral_code,
            referred_by: self.referred_by,
            created_at: decode_time(&self.created_at)?,
        })
    }
}

/// Database row for a ledger entry.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionRow {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub amount: i64,
    pub room_id: Option<String>,
    pub memo: Option<String>,
    pub created_at: String,
}

impl TransactionRow {
    pub fn new(
        user_id: &UserId,
        kind: TransactionKind,
        atoms: i64,
        room_id: Option<&RoomId>,
        memo: Option<&str>,
        created_at: &str,
    ) -> Self {
        Self {
            id: TransactionId::new().to_string(),
            user_id: user_id.to_string(),
            kind: kind.as_str().to_string(),
            amount: atoms,
            room_id: room_id.map(ToString::to_string),
            memo: memo.map(str::to_string),
            created_at: created_at.to_string(),
        }
    }

    pub fn into_entry(self) -> Result<LedgerEntry> {
        Ok(LedgerEntry {
            id: TransactionId::from(self.id),
            user_id: UserId::from(self.user_id),
            kind: parse::<TransactionKind>(&self.kind)?,
            amount: from_atoms(self.amount),
            room_id: self.room_id.map(RoomId::from),
            memo: self.memo,
            created_at: decode_time(&self.created_at)?,
        })
    }
}

/// Database row for a chat pool slot.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = chat_pool)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ChatSlotRow {
    pub id: String,
    pub chat_id: String,
    pub status: String,
    pub room_id: Option<String>,
    pub created_at: String,
}

impl ChatSlotRow {
    pub fn into_entry(self) -> Result<ChatPoolEntry> {
        Ok(ChatPoolEntry {
            id: ChatSlotId::from(self.id),
            chat: ChatRef::from(self.chat_id),
            status: parse::<ChatSlotStatus>(&self.status)?,
            room_id: self.room_id.map(RoomId::from),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewRoom;
    use chrono::{Duration, DurationRound, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn room_row_round_trips_money_and_market() {
        let now = Utc::now().duration_trunc(Duration::milliseconds(1)).unwrap();
        let mut room = NewRoom {
            title: "Token to 3M".into(),
            market: MarketKind::MarketCap {
                token_ref: "So11111111111111111111111111111111111111112".into(),
            },
            target: dec!(3000000),
            lock_at: now + Duration::minutes(5),
            settle_at: now + Duration::minutes(10),
            capacity: 4,
            min_bet: dec!(0.1),
            max_bet: Some(dec!(5)),
            creator: None,
            queued: false,
        }
        .into_room(now);
        room.pools.add(Side::Yes, dec!(1.25));
        room.lock_price = Some(dec!(2950000.5));

        let restored = RoomRow::from_room(&room).unwrap().into_room().unwrap();
        assert_eq!(restored, room);
    }

    #[test]
    fn unknown_status_is_a_parse_error() {
        let now = Utc::now();
        let room = NewRoom {
            title: "t".into(),
            market: MarketKind::Custom,
            target: dec!(1),
            lock_at: now,
            settle_at: now,
            capacity: 2,
            min_bet: dec!(1),
            max_bet: None,
            creator: None,
            queued: false,
        }
        .into_room(now);
        let mut row = RoomRow::from_room(&room).unwrap();
        row.status = "ARCHIVED".into();
        assert!(matches!(row.into_room(), Err(Error::Parse(_))));
    }
}
