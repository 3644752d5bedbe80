//! Command-line interface definitions.
//!
//! Defines the CLI structure for the pitboss application using `clap`.
//! Besides `run`, every subcommand is a one-shot operator action against the
//! configured database.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use crate::domain::{BetFilter, RoomStatus, Side};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG: &str = "pitboss.toml";

/// Parimutuel betting rooms with oracle-driven settlement
#[derive(Parser, Debug)]
#[command(name = "pitboss")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the configuration file.
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Top-level subcommands for the pitboss CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the settlement scheduler and chat listener (foreground)
    Run,

    /// Create, inspect and launch rooms
    #[command(subcommand)]
    Room(RoomCommand),

    /// Place bets on behalf of a user
    #[command(subcommand)]
    Bet(BetCommand),

    /// Operator settlement actions
    #[command(subcommand)]
    Admin(AdminCommand),

    /// Manage the chat pool
    #[command(subcommand)]
    Pool(PoolCommand),

    /// Manage user accounts and balances
    #[command(subcommand)]
    Wallet(WalletCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Subcommands for `pitboss room`.
#[derive(Subcommand, Debug)]
pub enum RoomCommand {
    /// Create a room that accepts bets immediately.
    Create(CreateRoomArgs),
    /// List rooms, newest first.
    List(ListRoomsArgs),
    /// Show a room with its bets.
    Show(RoomIdArg),
    /// Launch a queued room (QUEUING -> OPEN).
    Launch(RoomIdArg),
    /// Create a room that collects queued stakes until launched.
    Queue(CreateRoomArgs),
}

/// Kind of observable a room resolves against.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MarketArg {
    /// Spot price of a listed asset
    FixedPrice,
    /// Market capitalisation of a token
    MarketCap,
    /// Resolved by an operator
    Custom,
}

impl MarketArg {
    /// Storage tag understood by the domain.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::FixedPrice => "FIXED_PRICE",
            Self::MarketCap => "MARKET_CAP",
            Self::Custom => "CUSTOM",
        }
    }
}

/// Arguments shared by `room create` and `room queue`.
#[derive(Args, Debug)]
pub struct CreateRoomArgs {
    /// Question shown to players.
    #[arg(long)]
    pub title: String,
    /// Market kind.
    #[arg(long, value_enum)]
    pub market: MarketArg,
    /// Ticker symbol (fixed-price) or token address (market-cap).
    #[arg(long)]
    pub reference: Option<String>,
    /// Threshold value; YES wins when the observed value reaches it.
    #[arg(long)]
    pub target: Option<Decimal>,
    /// Betting closes at this time (RFC 3339).
    #[arg(long)]
    pub lock_at: DateTime<Utc>,
    /// Resolution time (RFC 3339).
    #[arg(long)]
    pub settle_at: DateTime<Utc>,
    /// Maximum number of players.
    #[arg(long, default_value = "50")]
    pub capacity: u32,
    /// Minimum stake.
    #[arg(long, default_value = "1")]
    pub min_bet: Decimal,
    /// Maximum stake.
    #[arg(long)]
    pub max_bet: Option<Decimal>,
    /// Creating user (receives the host fee).
    #[arg(long)]
    pub creator: Option<String>,
}

/// Arguments for `room list`.
#[derive(Args, Debug)]
pub struct ListRoomsArgs {
    /// Only rooms in this state.
    #[arg(long)]
    pub status: Option<RoomStatus>,
    /// Zero-based page number.
    #[arg(long, default_value = "0")]
    pub page: usize,
    /// Rooms per page.
    #[arg(long, default_value = "20")]
    pub page_size: usize,
}

/// A single room identifier.
#[derive(Args, Debug)]
pub struct RoomIdArg {
    /// Room identifier.
    pub room: String,
}

/// Subcommands for `pitboss bet`.
#[derive(Subcommand, Debug)]
pub enum BetCommand {
    /// Place an active bet in an open room.
    Place(BetArgs),
    /// Reserve a seat in a queuing room.
    JoinQueue(BetArgs),
}

/// Arguments for wagers.
#[derive(Args, Debug)]
pub struct BetArgs {
    /// Room identifier.
    #[arg(long)]
    pub room: String,
    /// Betting user.
    #[arg(long)]
    pub user: String,
    /// YES or NO.
    #[arg(long)]
    pub side: Side,
    /// Stake.
    #[arg(long)]
    pub amount: Decimal,
}

/// Subcommands for `pitboss admin`.
#[derive(Subcommand, Debug)]
pub enum AdminCommand {
    /// Settle a locked room with the given winner.
    Resolve(ResolveArgs),
    /// Lock a room if needed, then settle it with the given winner.
    ForceSettle(ResolveArgs),
    /// List locked rooms past their settle time.
    ManualQueue,
}

/// Arguments for admin settlement.
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Room identifier.
    pub room: String,
    /// Winning side.
    #[arg(long)]
    pub winner: Side,
}

/// Subcommands for `pitboss pool`.
#[derive(Subcommand, Debug)]
pub enum PoolCommand {
    /// Register a chat with the pool.
    Add {
        /// Platform chat identifier.
        #[arg(allow_hyphen_values = true)]
        chat: String,
    },
    /// List pooled chats.
    List,
}

/// Subcommands for `pitboss wallet`.
#[derive(Subcommand, Debug)]
pub enum WalletCommand {
    /// Create (or look up) the account for a platform user.
    Create(CreateUserArgs),
    /// Credit a deposit.
    Deposit(DepositArgs),
    /// Debit a withdrawal.
    Withdraw(WithdrawArgs),
    /// Show a user's balance.
    Balance(UserArg),
    /// Show a user's transaction history.
    History(HistoryArgs),
    /// List a user's bets (all, open, settled or won).
    Bets(UserBetsArgs),
    /// Show rooms a user has won, with stake and profit.
    Won(HistoryArgs),
    /// Show how many users a user referred and the rewards earned.
    Referrals(UserArg),
}

/// Arguments for `wallet create`.
#[derive(Args, Debug)]
pub struct CreateUserArgs {
    /// Platform user reference.
    pub external_ref: String,
    /// Display name.
    #[arg(long)]
    pub username: Option<String>,
    /// Referral code of the inviting user.
    #[arg(long)]
    pub referral: Option<String>,
}

/// Arguments for `wallet deposit`.
#[derive(Args, Debug)]
pub struct DepositArgs {
    /// User identifier.
    pub user: String,
    /// Amount to credit.
    pub amount: Decimal,
    /// Free-form note stored with the entry.
    #[arg(long)]
    pub memo: Option<String>,
}

/// Arguments for `wallet withdraw`.
#[derive(Args, Debug)]
pub struct WithdrawArgs {
    /// User identifier.
    pub user: String,
    /// Amount to debit.
    pub amount: Decimal,
    /// Destination address.
    #[arg(long)]
    pub to: String,
}

/// A single user identifier.
#[derive(Args, Debug)]
pub struct UserArg {
    /// User identifier.
    pub user: String,
}

/// Arguments for `wallet history`.
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// User identifier.
    pub user: String,
    /// Zero-based page number.
    #[arg(long, default_value = "0")]
    pub page: usize,
    /// Entries per page.
    #[arg(long, default_value = "20")]
    pub page_size: usize,
}

/// Arguments for `wallet bets`.
#[derive(Args, Debug)]
pub struct UserBetsArgs {
    /// User identifier.
    pub user: String,
    /// Which bets to list.
    #[arg(long, default_value = "all")]
    pub filter: BetFilter,
    /// Zero-based page number.
    #[arg(long, default_value = "0")]
    pub page: usize,
    /// Bets per page.
    #[arg(long, default_value = "10")]
    pub page_size: usize,
}

/// Subcommands for `pitboss config`.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate the configuration file for correctness.
    Validate,
}
