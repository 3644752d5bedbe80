//! Handlers for the `wallet` command group.

use std::path::Path;

use serde_json::json;
use tabled::Tabled;

use crate::adapter::inbound::cli::command::{
    CreateUserArgs, DepositArgs, HistoryArgs, UserBetsArgs, WithdrawArgs,
};
use crate::adapter::inbound::cli::{context, output};
use crate::domain::{LedgerEntry, PlayerBet};
use crate::error::Result;

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Time")]
    at: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "Memo")]
    memo: String,
}

impl From<&LedgerEntry> for EntryRow {
    fn from(entry: &LedgerEntry) -> Self {
        let signed = entry.signed_amount();
        Self {
            at: entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            kind: entry.kind.to_string(),
            amount: if signed.is_sign_negative() {
                output::negative(signed)
            } else {
                output::positive(format!("+{signed}"))
            },
            room: entry
                .room_id
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
            memo: entry.memo.clone().unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
struct PlayerBetRow {
    #[tabled(rename = "Placed")]
    at: String,
    #[tabled(rename = "Room")]
    room: String,
    #[tabled(rename = "Side")]
    side: String,
    #[tabled(rename = "Stake")]
    stake: String,
    #[tabled(rename = "Result")]
    result: String,
}

impl From<&PlayerBet> for PlayerBetRow {
    fn from(entry: &PlayerBet) -> Self {
        let bet = &entry.bet;
        let result = match bet.won {
            _ if !bet.settled => output::muted("open"),
            Some(true) => output::positive(format!("won +{}", bet.profit())),
            _ => output::negative(format!("lost -{}", bet.amount)),
        };
        Self {
            at: bet.created_at.format("%Y-%m-%d %H:%M").to_string(),
            room: entry.room_title.clone(),
            side: bet.side.to_string(),
            stake: bet.amount.to_string(),
            result,
        }
    }
}

/// Execute `wallet create`.
pub async fn execute_create(config: &Path, args: &CreateUserArgs) -> Result<()> {
    let app = context::open_app(config)?;
    let user = app
        .wallet
        .get_or_create_user(
            args.external_ref.trim(),
            args.username.as_deref(),
            args.referral.as_deref(),
        )
        .await?;

    if output::is_json() {
        output::json_output(json!({ "command": "wallet.create", "user": user }));
        return Ok(());
    }
    output::success(&format!("Account {}", output::highlight(&user.id)));
    output::field("External ref", &user.external_ref);
    if let Some(name) = &user.username {
        output::field("Username", name);
    }
    if let Some(handle) = &user.custody_handle {
        output::field("Deposit to", handle);
    }
    output::field("Referral code", &user.referral_code);
    if let Some(referrer) = &user.referred_by {
        output::field("Referred by", referrer);
    }
    output::field("Balance", user.balance);
    Ok(())
}

/// Execute `wallet deposit`.
pub async fn execute_deposit(config: &Path, args: &DepositArgs) -> Result<()> {
    let app = context::open_app(config)?;
    let user_id = context::user_id(&args.user);
    let entry = app
        .wallet
        .deposit(&user_id, args.amount, args.memo.as_deref())
        .await?;
    let balance = app.wallet.balance(&user_id).await?;
    print_entry("wallet.deposit", "Deposit credited", &entry, balance);
    Ok(())
}

/// Execute `wallet withdraw`.
pub async fn execute_withdraw(config: &Path, args: &WithdrawArgs) -> Result<()> {
    let app = context::open_app(config)?;
    let user_id = context::user_id(&args.user);
    let entry = app
        .wallet
        .withdraw(&user_id, args.amount, args.to.trim())
        .await?;
    let balance = app.wallet.balance(&user_id).await?;
    print_entry("wallet.withdraw", "Withdrawal debited", &entry, balance);
    Ok(())
}

/// Execute `wallet balance`.
pub async fn execute_balance(config: &Path, user: &str) -> Result<()> {
    let app = context::open_app(config)?;
    let user = app.wallet.user(&context::user_id(user)).await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "wallet.balance",
            "user_id": user.id,
            "balance": user.balance,
            "total_deposited": user.total_deposited,
            "total_withdrawn": user.total_withdrawn,
        }));
        return Ok(());
    }
    output::section("Balance");
    output::field("User", &user.id);
    output::field("Balance", output::highlight(user.balance));
    output::field("Deposited", user.total_deposited);
    output::field("Withdrawn", user.total_withdrawn);
    Ok(())
}

/// Execute `wallet history`.
pub async fn execute_history(config: &Path, args: &HistoryArgs) -> Result<()> {
    let app = context::open_app(config)?;
    let page = app
        .wallet
        .history(&context::user_id(&args.user), args.page, args.page_size)
        .await?;

    output::section(&format!(
        "History (page {} of {}, {} entries)",
        page.page + 1,
        page.total_pages().max(1),
        page.total
    ));
    let rows = page.items.iter().map(EntryRow::from).collect();
    output::table(
        "wallet.history",
        rows,
        json!({ "total": page.total, "entries": page.items }),
    );
    Ok(())
}

/// Execute `wallet bets`.
pub async fn execute_bets(config: &Path, args: &UserBetsArgs) -> Result<()> {
    let app = context::open_app(config)?;
    let page = app
        .wallet
        .bets(
            &context::user_id(&args.user),
            args.filter,
            args.page,
            args.page_size,
        )
        .await?;

    output::section(&format!(
        "Bets: {} (page {} of {}, {} bets)",
        args.filter,
        page.page + 1,
        page.total_pages().max(1),
        page.total
    ));
    let rows = page.items.iter().map(PlayerBetRow::from).collect();
    output::table(
        "wallet.bets",
        rows,
        json!({ "filter": args.filter, "total": page.total, "bets": page.items }),
    );
    Ok(())
}

/// Execute `wallet won`.
pub async fn execute_won(config: &Path, args: &HistoryArgs) -> Result<()> {
    let app = context::open_app(config)?;
    let won = app
        .wallet
        .winnings(&context::user_id(&args.user), args.page, args.page_size)
        .await?;

    output::section(&format!(
        "Rooms won (page {} of {})",
        won.page.page + 1,
        won.page.total_pages().max(1)
    ));
    let rows = won.page.items.iter().map(PlayerBetRow::from).collect();
    output::table(
        "wallet.won",
        rows,
        json!({
            "total": won.page.total,
            "bets": won.page.items,
            "staked": won.totals.staked,
            "payout": won.totals.payout,
            "profit": won.totals.profit(),
        }),
    );
    if !output::is_json() {
        output::field("Wins", won.totals.count);
        output::field("Total profit", output::positive(format!("+{}", won.totals.profit())));
        output::field("Total winnings", won.totals.payout);
    }
    Ok(())
}

/// Execute `wallet referrals`.
pub async fn execute_referrals(config: &Path, user: &str) -> Result<()> {
    let app = context::open_app(config)?;
    let stats = app.wallet.referral_stats(&context::user_id(user)).await?;

    if output::is_json() {
        output::json_output(json!({ "command": "wallet.referrals", "stats": stats }));
        return Ok(());
    }
    output::section("Referrals");
    output::field("Code", output::highlight(&stats.referral_code));
    output::field("Referred", stats.referred_count);
    output::field("Rewards", stats.total_rewards);
    Ok(())
}

fn print_entry(command: &str, message: &str, entry: &LedgerEntry, balance: rust_decimal::Decimal) {
    if output::is_json() {
        output::json_output(json!({
            "command": command,
            "entry": entry,
            "balance": balance,
        }));
        return;
    }
    output::success(message);
    output::field("Amount", entry.amount);
    if let Some(memo) = &entry.memo {
        output::field("Memo", memo);
    }
    output::field("Balance", output::highlight(balance));
}
