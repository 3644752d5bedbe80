//! Platform-independent handling of bot commands.
//!
//! Private chats drive the join-then-bet flow; the selected room is a
//! session record with a TTL. Room chats are behind the participant gate and
//! the per-command cooldown.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::warn;

use super::command::{parse_command, private_help, room_help, BotCommand, CommandParseError};
use crate::application::chat::{PLEASE_WAIT_MESSAGE, REFUSAL_MESSAGE};
use crate::application::{ChatCoordinator, Gate, OracleResolver, RoomService, WalletService};
use crate::domain::{
    Amount, BetFilter, ChatRef, FeeSchedule, PlayerBet, Room, RoomId, RoomStatus, Side, User,
    UserId,
};
use crate::error::{Error, Result};
use crate::port::outbound::SessionStore;

/// How long a room selection survives in a private chat.
const DRAFT_TTL_MINUTES: i64 = 10;

/// Rooms shown by `/rooms`.
const ROOM_LIST_LIMIT: usize = 10;

/// Bets per page in `/mybets`, `/history` and `/won`.
const BET_PAGE_SIZE: usize = 10;

/// A message as seen by the handler.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat: ChatRef,
    pub private: bool,
    /// Sender's platform identity.
    pub user_ref: String,
    pub username: Option<String>,
    pub text: String,
    pub now: DateTime<Utc>,
}

pub struct CommandHandler {
    rooms: Arc<RoomService>,
    wallet: Arc<WalletService>,
    chats: Arc<ChatCoordinator>,
    resolver: Arc<OracleResolver>,
    sessions: Arc<dyn SessionStore>,
    fees: FeeSchedule,
}

fn draft_key(user_ref: &str) -> String {
    format!("draft:{user_ref}")
}

/// User-facing text for a failed operation.
fn failure(err: &Error) -> String {
    match err {
        Error::Domain(e) => format!("❌ {e}"),
        other => {
            warn!(error = %other, "Command failed");
            "❌ Something went wrong, please try again later.".to_string()
        }
    }
}

impl CommandHandler {
    pub fn new(
        rooms: Arc<RoomService>,
        wallet: Arc<WalletService>,
        chats: Arc<ChatCoordinator>,
        resolver: Arc<OracleResolver>,
        sessions: Arc<dyn SessionStore>,
        fees: FeeSchedule,
    ) -> Self {
        Self {
            rooms,
            wallet,
            chats,
            resolver,
            sessions,
            fees,
        }
    }

    /// Reply for a message, or None when the bot should stay silent.
    pub async fn handle(&self, msg: &IncomingMessage) -> Option<String> {
        let command = match parse_command(&msg.text) {
            Ok(command) => command,
            Err(CommandParseError::NotACommand) => return None,
            Err(err) if msg.private => return Some(format!("{err}\n\n{}", private_help())),
            Err(_) => return None,
        };

        let reply = if msg.private {
            self.private(msg, command).await
        } else {
            self.room_chat(msg, command).await
        };
        let text = reply.unwrap_or_else(|e| failure(&e));
        (!text.is_empty()).then_some(text)
    }

    async fn private(&self, msg: &IncomingMessage, command: BotCommand) -> Result<String> {
        match command {
            BotCommand::Start | BotCommand::Help => Ok(private_help().to_string()),
            BotCommand::Rooms => self.list_rooms().await,
            BotCommand::Join { room } => self.select_room(msg, &room).await,
            BotCommand::Leave => {
                self.sessions.remove(&draft_key(&msg.user_ref)).await?;
                Ok("Room selection cleared.".to_string())
            }
            BotCommand::Bet { amount, side } => self.bet_selected(msg, amount, side).await,
            BotCommand::Balance => {
                let user = self.user(msg).await?;
                Ok(format!("💰 Balance: {}", user.balance.normalize()))
            }
            BotCommand::MyBets => self.my_bets(msg).await,
            BotCommand::History { page } => self.history(msg, page).await,
            BotCommand::Won { page } => self.won(msg, page).await,
            BotCommand::Referrals => {
                let user = self.user(msg).await?;
                let stats = self.wallet.referral_stats(&user.id).await?;
                Ok(format!(
                    "🤝 Referral code: {}\nReferred: {}\nRewards: {}",
                    stats.referral_code,
                    stats.referred_count,
                    stats.total_rewards.normalize()
                ))
            }
            BotCommand::Watch | BotCommand::Players | BotCommand::Stats | BotCommand::Oracle => {
                Ok("Use this command inside a room chat.".to_string())
            }
        }
    }

    async fn my_bets(&self, msg: &IncomingMessage) -> Result<String> {
        let user = self.user(msg).await?;
        let (open, total) = self.wallet.bet_counts(&user.id).await?;
        let mut out = format!("🧾 My bets\nOpen: {open}\nTotal placed: {total}");
        if open == 0 {
            out.push_str("\n\nNo open bets. Use /rooms to find one.");
            return Ok(out);
        }
        let page = self
            .wallet
            .bets(&user.id, BetFilter::Open, 0, BET_PAGE_SIZE)
            .await?;
        out.push('\n');
        for (i, entry) in page.items.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. {} {} on {}",
                i + 1,
                entry.room_title,
                entry.bet.amount.normalize(),
                entry.bet.side
            ));
        }
        Ok(out)
    }

    async fn history(&self, msg: &IncomingMessage, page: usize) -> Result<String> {
        let user = self.user(msg).await?;
        let page = self
            .wallet
            .bets(&user.id, BetFilter::Settled, page.saturating_sub(1), BET_PAGE_SIZE)
            .await?;
        if page.total == 0 {
            return Ok("📜 No settled bets yet.".to_string());
        }
        if page.items.is_empty() {
            return Ok(format!(
                "📜 Bet history ends at page {}.",
                page.total_pages()
            ));
        }
        let mut out = format!(
            "📜 Bet history (page {}/{})\n",
            page.page + 1,
            page.total_pages().max(1)
        );
        for (i, entry) in page.items.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. {}",
                page.page * page.page_size + i + 1,
                settled_line(entry)
            ));
        }
        Ok(out)
    }

    async fn won(&self, msg: &IncomingMessage, page: usize) -> Result<String> {
        let user = self.user(msg).await?;
        let won = self
            .wallet
            .winnings(&user.id, page.saturating_sub(1), BET_PAGE_SIZE)
            .await?;
        if won.totals.count == 0 {
            return Ok("🏆 No wins yet. Keep betting to get your first win!".to_string());
        }
        let mut out = String::from("🏆 Rooms won\n");
        for (i, entry) in won.page.items.iter().enumerate() {
            out.push_str(&format!(
                "\n{}. {}\n   Staked: {} | Profit: +{}",
                won.page.page * won.page.page_size + i + 1,
                entry.room_title,
                entry.bet.amount.normalize(),
                entry.bet.profit().normalize()
            ));
        }
        out.push_str(&format!(
            "\n\nTotal profit: +{}\nTotal winnings: {}",
            won.totals.profit().normalize(),
            won.totals.payout.normalize()
        ));
        if won.page.total_pages() > 1 {
            out.push_str(&format!(
                "\nPage {}/{}",
                won.page.page + 1,
                won.page.total_pages()
            ));
        }
        Ok(out)
    }

    async fn room_chat(&self, msg: &IncomingMessage, command: BotCommand) -> Result<String> {
        if !command.is_room_command() {
            return Ok("Use this command in a private chat with the bot.".to_string());
        }
        let gate = self
            .chats
            .authorize(&msg.chat, &msg.user_ref, command.name(), msg.now)
            .await?;
        let (room, user) = match gate {
            Gate::Allowed { room, user } => (room, user),
            Gate::NotRoomChat | Gate::Throttled => return Ok(String::new()),
            Gate::Refused => return Ok(REFUSAL_MESSAGE.to_string()),
            Gate::PleaseWait => return Ok(PLEASE_WAIT_MESSAGE.to_string()),
        };

        match command {
            BotCommand::Bet { amount, side } => self.bet(&user.id, &room, amount, side).await,
            BotCommand::Watch => Ok(watch(&room)),
            BotCommand::Players => self.players(&room).await,
            BotCommand::Stats => self.stats(&room, &user).await,
            BotCommand::Oracle => Ok(self.oracle(&room).await),
            _ => Ok(room_help().to_string()),
        }
    }

    async fn user(&self, msg: &IncomingMessage) -> Result<User> {
        self.wallet
            .get_or_create_user(&msg.user_ref, msg.username.as_deref(), None)
            .await
    }

    async fn list_rooms(&self) -> Result<String> {
        let page = self
            .rooms
            .list_rooms(Some(RoomStatus::Open), 0, ROOM_LIST_LIMIT)
            .await?;
        if page.items.is_empty() {
            return Ok("No rooms are open right now.".to_string());
        }
        let mut out = format!("🎲 Open rooms ({})\n", page.total);
        for room in &page.items {
            out.push_str(&format!(
                "\n#{} {} ({}/{} players, pool {})",
                room.short_id(),
                room.title,
                room.current_players,
                room.capacity,
                room.pools.total.normalize()
            ));
        }
        out.push_str("\n\nSelect one with /join <room>");
        Ok(out)
    }

    /// Resolve a full id or an 8-char short id among rooms taking bets.
    async fn find_room(&self, reference: &str) -> Result<Option<Room>> {
        let reference = reference.trim_start_matches('#');
        if let Ok(details) = self.rooms.room_details(&RoomId::from(reference)).await {
            return Ok(Some(details.room));
        }
        for status in [RoomStatus::Open, RoomStatus::Queuing] {
            let mut page_no = 0;
            loop {
                let page = self.rooms.list_rooms(Some(status), page_no, 100).await?;
                if let Some(room) = page
                    .items
                    .into_iter()
                    .find(|r| r.short_id().eq_ignore_ascii_case(reference))
                {
                    return Ok(Some(room));
                }
                page_no += 1;
                if page_no >= page.total.div_ceil(100) {
                    break;
                }
            }
        }
        Ok(None)
    }

    async fn select_room(&self, msg: &IncomingMessage, reference: &str) -> Result<String> {
        let Some(room) = self.find_room(reference).await? else {
            return Ok(format!("No open room matches `{reference}`."));
        };
        if !matches!(room.status, RoomStatus::Open | RoomStatus::Queuing) {
            return Ok(format!("Room #{} is not taking bets.", room.short_id()));
        }
        self.sessions
            .put(
                &draft_key(&msg.user_ref),
                room.id.as_str(),
                msg.now + Duration::minutes(DRAFT_TTL_MINUTES),
            )
            .await?;
        let max = room
            .max_bet
            .map_or_else(|| "none".to_string(), |m| m.normalize().to_string());
        Ok(format!(
            "Selected #{} {}\nMin bet {}, max bet {}\nNow send /bet <amount> <YES|NO>",
            room.short_id(),
            room.title,
            room.min_bet.normalize(),
            max
        ))
    }

    async fn bet_selected(
        &self,
        msg: &IncomingMessage,
        amount: Amount,
        side: Side,
    ) -> Result<String> {
        let key = draft_key(&msg.user_ref);
        let Some(room_id) = self.sessions.get(&key, msg.now).await? else {
            return Ok("Select a room first with /join <room>.".to_string());
        };
        let room = self.rooms.room_details(&RoomId::from(room_id)).await?.room;
        let user = self.user(msg).await?;
        let reply = self.bet(&user.id, &room, amount, side).await?;
        self.sessions.remove(&key).await?;
        Ok(reply)
    }

    async fn bet(
        &self,
        user_id: &UserId,
        room: &Room,
        amount: Amount,
        side: Side,
    ) -> Result<String> {
        let bet = if room.status == RoomStatus::Queuing {
            self.rooms.join_queue(user_id, &room.id, side, amount).await?
        } else {
            self.rooms.place_bet(user_id, &room.id, side, amount).await?
        };
        let mut reply = format!(
            "✅ Bet placed: {} on {} in #{}",
            bet.amount.normalize(),
            bet.side,
            room.short_id()
        );
        if let Some(link) = &room.invite_link {
            reply.push_str(&format!("\nRoom chat: {link}"));
        }
        Ok(reply)
    }

    async fn players(&self, room: &Room) -> Result<String> {
        let bets = self.rooms.room_details(&room.id).await?.bets;
        let yes = bets.iter().filter(|b| b.side == Side::Yes).count();
        let no = bets.len() - yes;
        Ok(format!(
            "👥 {}/{} players\nYES: {} ({})\nNO: {} ({})",
            room.current_players,
            room.capacity,
            yes,
            room.pools.yes.normalize(),
            no,
            room.pools.no.normalize()
        ))
    }

    async fn stats(&self, room: &Room, user: &User) -> Result<String> {
        let bets = self.rooms.room_details(&room.id).await?.bets;
        let Some(bet) = bets.iter().find(|b| b.user_id == user.id) else {
            return Ok(REFUSAL_MESSAGE.to_string());
        };
        let side_pool = room.pools.side(bet.side);
        let potential = if side_pool > Decimal::ZERO {
            bet.amount / side_pool * room.pools.total * self.fees.payout_rate()
        } else {
            Decimal::ZERO
        };
        Ok(format!(
            "📊 Your bet: {} on {}\nPayout if {} wins: {}",
            bet.amount.normalize(),
            bet.side,
            bet.side,
            potential.round_dp(4).normalize()
        ))
    }

    async fn oracle(&self, room: &Room) -> String {
        match self.resolver.observe(&room.market).await {
            Ok(value) => format!(
                "📈 Current: {}\n🎯 Target: {}\n{}",
                value.normalize(),
                room.target.normalize(),
                if value >= room.target {
                    "Target reached"
                } else {
                    "Target not reached yet"
                }
            ),
            Err(reason) => format!("Oracle unavailable: {reason}"),
        }
    }
}

fn settled_line(entry: &PlayerBet) -> String {
    let bet = &entry.bet;
    if bet.won == Some(true) {
        format!(
            "🏆 {} {} on {}, paid {} (+{})",
            entry.room_title,
            bet.amount.normalize(),
            bet.side,
            bet.payout.normalize(),
            bet.profit().normalize()
        )
    } else {
        format!(
            "❌ {} {} on {}, lost",
            entry.room_title,
            bet.amount.normalize(),
            bet.side
        )
    }
}

fn watch(room: &Room) -> String {
    format!(
        "🎲 #{} {}\nStatus: {}\nTarget: {}\nPool: {} (YES {}, NO {})\nLocks: {}\nSettles: {}",
        room.short_id(),
        room.title,
        room.status,
        room.target.normalize(),
        room.pools.total.normalize(),
        room.pools.yes.normalize(),
        room.pools.no.normalize(),
        room.lock_at.format("%Y-%m-%d %H:%M UTC"),
        room.settle_at.format("%Y-%m-%d %H:%M UTC")
    )
}
