//! Handlers for the `bet` command group.

use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::command::BetArgs;
use crate::adapter::inbound::cli::{context, output};
use crate::domain::{Bet, WagerStage};
use crate::error::Result;

/// Execute `bet place` or `bet join-queue`.
pub async fn execute(config: &Path, args: &BetArgs, stage: WagerStage) -> Result<()> {
    let app = context::open_app(config)?;
    let room_id = context::room_id(&args.room);
    let user_id = context::user_id(&args.user);

    let bet = match stage {
        WagerStage::Open => {
            app.rooms
                .place_bet(&user_id, &room_id, args.side, args.amount)
                .await?
        }
        WagerStage::Queue => {
            app.rooms
                .join_queue(&user_id, &room_id, args.side, args.amount)
                .await?
        }
    };
    print_bet(&bet, stage);
    Ok(())
}

fn print_bet(bet: &Bet, stage: WagerStage) {
    if output::is_json() {
        let command = match stage {
            WagerStage::Open => "bet.place",
            WagerStage::Queue => "bet.join_queue",
        };
        output::json_output(json!({ "command": command, "bet": bet }));
        return;
    }

    output::success(&match stage {
        WagerStage::Open => "Bet placed".to_string(),
        WagerStage::Queue => "Seat reserved".to_string(),
    });
    output::field("Bet", &bet.id);
    output::field("Room", &bet.room_id);
    output::field("Side", bet.side);
    output::field("Amount", bet.amount);
    output::field("Status", bet.status);
}
