//! Handlers for the `room` command group.

use std::path::Path;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use tabled::Tabled;

use crate::adapter::inbound::cli::command::{CreateRoomArgs, ListRoomsArgs, MarketArg};
use crate::adapter::inbound::cli::{context, output};
use crate::domain::{Bet, DomainError, MarketKind, NewRoom, Room};
use crate::error::Result;

#[derive(Tabled)]
struct RoomRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Market")]
    market: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Players")]
    players: String,
    #[tabled(rename = "Pool")]
    pool: String,
    #[tabled(rename = "Settles")]
    settle_at: String,
}

impl From<&Room> for RoomRow {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.to_string(),
            title: room.title.clone(),
            market: room.market.to_string(),
            status: room.status.to_string(),
            players: format!("{}/{}", room.current_players, room.capacity),
            pool: room.pools.total.to_string(),
            settle_at: room.settle_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

#[derive(Tabled)]
struct BetRow {
    #[tabled(rename = "User")]
    user: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Payout")]
    payout: String,
}

impl From<&Bet> for BetRow {
    fn from(bet: &Bet) -> Self {
        Self {
            user: bet.user_id.to_string(),
            side: bet.side.to_string(),
            amount: bet.amount.to_string(),
            status: bet.status.to_string(),
            payout: match bet.won {
                Some(true) => output::positive(bet.payout),
                Some(false) => output::negative(bet.payout),
                None => output::muted("-"),
            },
        }
    }
}

fn new_room(args: &CreateRoomArgs, queued: bool) -> Result<NewRoom> {
    let market = MarketKind::from_parts(args.market.label(), args.reference.as_deref())?;
    // Custom rooms never compare against the target.
    let target = match (args.target, args.market) {
        (Some(target), _) => target,
        (None, MarketArg::Custom) => Decimal::ONE,
        (None, _) => {
            return Err(
                DomainError::InvalidRoom("threshold markets require --target".into()).into(),
            )
        }
    };
    Ok(NewRoom {
        title: args.title.trim().to_string(),
        market,
        target,
        lock_at: args.lock_at,
        settle_at: args.settle_at,
        capacity: args.capacity,
        min_bet: args.min_bet,
        max_bet: args.max_bet,
        creator: args.creator.as_deref().map(context::user_id),
        queued,
    })
}

/// Execute `room create` (or `room queue` when `queued`).
pub async fn execute_create(config: &Path, args: &CreateRoomArgs, queued: bool) -> Result<()> {
    let draft = new_room(args, queued)?;
    let app = context::open_app(config)?;
    let room = app.rooms.create_room(draft, Utc::now()).await?;

    if output::is_json() {
        output::json_output(json!({ "command": "room.create", "room": room }));
        return Ok(());
    }
    output::success(&format!("Room {} created", output::highlight(&room.id)));
    print_room(&room);
    if room.chat.is_none() && !queued {
        output::warning("No chat assigned; add chats with `pitboss pool add`");
    }
    Ok(())
}

/// Execute `room list`.
pub async fn execute_list(config: &Path, args: &ListRoomsArgs) -> Result<()> {
    let app = context::open_app(config)?;
    let page = app
        .rooms
        .list_rooms(args.status, args.page, args.page_size)
        .await?;

    output::section(&format!(
        "Rooms (page {} of {}, {} total)",
        page.page + 1,
        page.total_pages().max(1),
        page.total
    ));
    let rows = page.items.iter().map(RoomRow::from).collect();
    output::table("room.list", rows, json!({ "total": page.total, "rooms": page.items }));
    Ok(())
}

/// Execute `room show`.
pub async fn execute_show(config: &Path, room_id: &str) -> Result<()> {
    let app = context::open_app(config)?;
    let details = app.rooms.room_details(&context::room_id(room_id)).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "room.show",
            "room": details.room,
            "bets": details.bets,
        }));
        return Ok(());
    }
    print_room(&details.room);
    output::section("Bets");
    let rows = details.bets.iter().map(BetRow::from).collect();
    output::table("room.show", rows, json!(details.bets));
    Ok(())
}

/// Execute `room launch`.
pub async fn execute_launch(config: &Path, room_id: &str) -> Result<()> {
    let app = context::open_app(config)?;
    let room = app.rooms.launch_room(&context::room_id(room_id)).await?;

    if output::is_json() {
        output::json_output(json!({ "command": "room.launch", "room": room }));
        return Ok(());
    }
    output::success(&format!("Room {} launched", output::highlight(&room.id)));
    print_room(&room);
    Ok(())
}

fn print_room(room: &Room) {
    output::section(&room.title);
    output::field("ID", &room.id);
    output::field("Market", &room.market);
    if room.market.supports_early_resolution() {
        output::field("Target", room.target);
    }
    output::field("Status", room.status);
    output::field(
        "Players",
        format!("{}/{}", room.current_players, room.capacity),
    );
    output::field(
        "Pools",
        format!(
            "YES {} / NO {} (total {})",
            room.pools.yes, room.pools.no, room.pools.total
        ),
    );
    output::field("Locks", room.lock_at.to_rfc3339());
    output::field("Settles", room.settle_at.to_rfc3339());
    if let Some(chat) = &room.chat {
        output::field("Chat", chat);
    }
    if let Some(invite) = &room.invite_link {
        output::field("Invite", invite);
    }
    if let Some(price) = room.lock_price {
        output::field("Lock price", price);
    }
    if let Some(side) = room.winning_side {
        output::field("Winner", output::positive(side));
    }
    if let Some(price) = room.settle_price {
        output::field("Settle price", price);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn args(market: MarketArg, reference: Option<&str>, target: Option<Decimal>) -> CreateRoomArgs {
        let now = Utc::now();
        CreateRoomArgs {
            title: " Will it pump? ".into(),
            market,
            reference: reference.map(str::to_string),
            target,
            lock_at: now + Duration::hours(1),
            settle_at: now + Duration::hours(2),
            capacity: 10,
            min_bet: dec!(1),
            max_bet: None,
            creator: None,
        }
    }

    #[test]
    fn custom_rooms_need_no_target() {
        let draft = new_room(&args(MarketArg::Custom, None, None), true).unwrap();
        assert_eq!(draft.market, MarketKind::Custom);
        assert_eq!(draft.title, "Will it pump?");
        assert!(draft.queued);
        assert!(draft.validate(Utc::now()).is_ok());
    }

    #[test]
    fn threshold_rooms_require_target() {
        assert!(new_room(&args(MarketArg::FixedPrice, Some("sol"), None), false).is_err());
        let draft =
            new_room(&args(MarketArg::FixedPrice, Some("sol"), Some(dec!(200))), false).unwrap();
        assert_eq!(
            draft.market,
            MarketKind::FixedPrice {
                symbol: "SOL".into()
            }
        );
    }

    #[test]
    fn market_cap_requires_reference() {
        assert!(new_room(&args(MarketArg::MarketCap, None, Some(dec!(1))), false).is_err());
    }
}
