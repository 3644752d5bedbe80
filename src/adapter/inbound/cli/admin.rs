//! Handlers for the `admin` command group.

use std::path::Path;

use chrono::Utc;
use serde_json::json;
use tabled::Tabled;

use crate::adapter::inbound::cli::command::ResolveArgs;
use crate::adapter::inbound::cli::{context, output};
use crate::domain::Room;
use crate::error::Result;
use crate::port::outbound::SettleOutcome;

#[derive(Tabled)]
struct ManualRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Market")]
    market: String,
    #[tabled(rename = "Pool")]
    pool: String,
    #[tabled(rename = "Settle due")]
    settle_at: String,
}

impl From<&Room> for ManualRow {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.to_string(),
            title: room.title.clone(),
            market: room.market.to_string(),
            pool: room.pools.total.to_string(),
            settle_at: room.settle_at.to_rfc3339(),
        }
    }
}

/// Execute `admin resolve` or, with `force`, `admin force-settle`.
pub async fn execute_resolve(config: &Path, args: &ResolveArgs, force: bool) -> Result<()> {
    let app = context::open_app(config)?;
    let room_id = context::room_id(&args.room);
    let outcome = if force {
        app.rooms.force_settle(&room_id, args.winner).await?
    } else {
        app.rooms.admin_resolve(&room_id, args.winner).await?
    };

    let settled = matches!(outcome, SettleOutcome::Settled(_));
    if output::is_json() {
        output::json_output(json!({
            "command": if force { "admin.force_settle" } else { "admin.resolve" },
            "room_id": room_id,
            "winning_side": args.winner,
            "settled": settled,
        }));
        return Ok(());
    }

    match outcome {
        SettleOutcome::Settled(receipt) => {
            output::success(&format!(
                "Room {} settled, {} wins",
                output::highlight(&room_id),
                args.winner
            ));
            output::field("Winners paid", receipt.winnings.len());
            if let Some((host, fee)) = &receipt.host_fee {
                output::field("Host fee", format!("{fee} to {host}"));
            }
            if !receipt.referral_rewards.is_empty() {
                output::field("Referrals", receipt.referral_rewards.len());
            }
        }
        SettleOutcome::AlreadySettled => {
            output::warning(&format!("Room {room_id} was already settled; nothing changed"));
        }
    }
    Ok(())
}

/// Execute `admin manual-queue`.
pub async fn execute_manual_queue(config: &Path) -> Result<()> {
    let app = context::open_app(config)?;
    let rooms = app.rooms.manual_queue(Utc::now()).await?;

    output::section(&format!("Awaiting manual resolution ({})", rooms.len()));
    let rows = rooms.iter().map(ManualRow::from).collect();
    output::table("admin.manual_queue", rows, json!(rooms));
    if !rooms.is_empty() {
        output::hint(&format!(
            "settle with {}",
            output::highlight("pitboss admin resolve <room> --winner YES|NO")
        ));
    }
    Ok(())
}
