//! Telegram command parsing.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::domain::Side;

/// Supported bot commands.
#[derive(Debug, Clone, PartialEq)]
pub enum BotCommand {
    Start,
    Help,
    /// List rooms accepting bets.
    Rooms,
    /// Select a room for the next `/bet` (private chat).
    Join { room: String },
    /// Drop the selected room.
    Leave,
    Bet { amount: Decimal, side: Side },
    Balance,
    /// Open and lifetime bet counts with the open bets.
    MyBets,
    /// Settled bets, one page at a time (1-based).
    History { page: usize },
    /// Won bets with profit.
    Won { page: usize },
    Referrals,
    Watch,
    Players,
    Stats,
    Oracle,
}

impl BotCommand {
    /// Name used for cooldown keys.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Rooms => "rooms",
            Self::Join { .. } => "join",
            Self::Leave => "leave",
            Self::Bet { .. } => "bet",
            Self::Balance => "balance",
            Self::MyBets => "mybets",
            Self::History { .. } => "history",
            Self::Won { .. } => "won",
            Self::Referrals => "referrals",
            Self::Watch => "watch",
            Self::Players => "players",
            Self::Stats => "stats",
            Self::Oracle => "oracle",
        }
    }

    /// Whether the command is served inside room chats.
    #[must_use]
    pub const fn is_room_command(&self) -> bool {
        matches!(
            self,
            Self::Bet { .. } | Self::Watch | Self::Players | Self::Stats | Self::Oracle | Self::Help
        )
    }
}

/// Parse error for Telegram command messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    NotACommand,
    UnknownCommand(String),
    MissingArgument(&'static str),
    InvalidAmount(String),
    InvalidSide(String),
    InvalidPage(String),
}

impl std::fmt::Display for CommandParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotACommand => write!(f, "message is not a command"),
            Self::UnknownCommand(cmd) => write!(f, "unknown command `{cmd}`"),
            Self::MissingArgument(name) => write!(f, "missing argument `{name}`"),
            Self::InvalidAmount(value) => write!(f, "invalid amount `{value}`"),
            Self::InvalidSide(value) => write!(f, "invalid side `{value}` (use YES or NO)"),
            Self::InvalidPage(value) => write!(f, "invalid page `{value}`"),
        }
    }
}

impl std::error::Error for CommandParseError {}

/// Optional 1-based page argument; defaults to the first page.
fn page_arg(raw: Option<&str>) -> Result<usize, CommandParseError> {
    match raw {
        None => Ok(1),
        Some(value) => value
            .parse::<usize>()
            .ok()
            .filter(|page| *page > 0)
            .ok_or_else(|| CommandParseError::InvalidPage(value.to_string())),
    }
}

/// Parse a Telegram message into a bot command.
pub fn parse_command(text: &str) -> Result<BotCommand, CommandParseError> {
    let mut parts = text.split_whitespace();
    let Some(raw_command) = parts.next() else {
        return Err(CommandParseError::NotACommand);
    };
    if !raw_command.starts_with('/') {
        return Err(CommandParseError::NotACommand);
    }

    let command = raw_command
        .split_once('@')
        .map_or(raw_command, |(head, _)| head);

    match command {
        "/start" => Ok(BotCommand::Start),
        "/help" => Ok(BotCommand::Help),
        "/rooms" => Ok(BotCommand::Rooms),
        "/join" => {
            let room = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("room"))?;
            Ok(BotCommand::Join {
                room: room.to_string(),
            })
        }
        "/leave" => Ok(BotCommand::Leave),
        "/bet" => {
            let raw_amount = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("amount"))?;
            let raw_side = parts
                .next()
                .ok_or(CommandParseError::MissingArgument("side"))?;
            let amount = Decimal::from_str(raw_amount)
                .map_err(|_| CommandParseError::InvalidAmount(raw_amount.to_string()))?;
            let side = Side::from_str(raw_side)
                .map_err(|_| CommandParseError::InvalidSide(raw_side.to_string()))?;
            Ok(BotCommand::Bet { amount, side })
        }
        "/balance" => Ok(BotCommand::Balance),
        "/mybets" => Ok(BotCommand::MyBets),
        "/history" => Ok(BotCommand::History {
            page: page_arg(parts.next())?,
        }),
        "/won" => Ok(BotCommand::Won {
            page: page_arg(parts.next())?,
        }),
        "/referrals" => Ok(BotCommand::Referrals),
        "/watch" => Ok(BotCommand::Watch),
        "/players" => Ok(BotCommand::Players),
        "/stats" => Ok(BotCommand::Stats),
        "/oracle" => Ok(BotCommand::Oracle),
        other => Err(CommandParseError::UnknownCommand(other.to_string())),
    }
}

/// Help text for private chats.
#[must_use]
pub const fn private_help() -> &'static str {
    "Commands\n\n\
    /rooms - Rooms accepting bets\n\
    /join <room> - Select a room\n\
    /bet <amount> <YES|NO> - Bet on the selected room\n\
    /leave - Clear the selected room\n\
    /balance - Your balance\n\
    /mybets - Your open bets\n\
    /history [page] - Your settled bets\n\
    /won [page] - Rooms you won\n\
    /referrals - Your referral code and rewards"
}

/// Help text for room chats.
#[must_use]
pub const fn room_help() -> &'static str {
    "Room commands\n\n\
    /watch - Room status and pools\n\
    /players - Participants by side\n\
    /stats - Your position\n\
    /oracle - Current observed value\n\
    /bet <amount> <YES|NO> - Place a bet"
}

/// Bot commands for Telegram menu registration.
#[must_use]
pub fn bot_commands() -> Vec<(&'static str, &'static str)> {
    vec![
        ("rooms", "Rooms accepting bets"),
        ("join", "Select a room"),
        ("bet", "Place a bet"),
        ("leave", "Clear the selected room"),
        ("balance", "Your balance"),
        ("mybets", "Your open bets"),
        ("history", "Your settled bets"),
        ("won", "Rooms you won"),
        ("referrals", "Your referral code and rewards"),
        ("watch", "Room status and pools"),
        ("players", "Participants by side"),
        ("stats", "Your position"),
        ("oracle", "Current observed value"),
        ("help", "Show all commands"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parse_bet() {
        assert_eq!(
            parse_command("/bet 1.5 yes").unwrap(),
            BotCommand::Bet {
                amount: dec!(1.5),
                side: Side::Yes
            }
        );
        assert_eq!(
            parse_command("/bet@pitboss_bot 2 N").unwrap(),
            BotCommand::Bet {
                amount: dec!(2),
                side: Side::No
            }
        );
    }

    #[test]
    fn bet_argument_errors() {
        assert_eq!(
            parse_command("/bet"),
            Err(CommandParseError::MissingArgument("amount"))
        );
        assert_eq!(
            parse_command("/bet 1"),
            Err(CommandParseError::MissingArgument("side"))
        );
        assert_eq!(
            parse_command("/bet lots YES"),
            Err(CommandParseError::InvalidAmount("lots".into()))
        );
        assert_eq!(
            parse_command("/bet 1 MAYBE"),
            Err(CommandParseError::InvalidSide("MAYBE".into()))
        );
    }

    #[test]
    fn parse_paged_views() {
        assert_eq!(
            parse_command("/history").unwrap(),
            BotCommand::History { page: 1 }
        );
        assert_eq!(parse_command("/won 3").unwrap(), BotCommand::Won { page: 3 });
        assert_eq!(
            parse_command("/won 0"),
            Err(CommandParseError::InvalidPage("0".into()))
        );
        assert_eq!(
            parse_command("/history next"),
            Err(CommandParseError::InvalidPage("next".into()))
        );
        assert!(!parse_command("/mybets").unwrap().is_room_command());
        assert!(!parse_command("/referrals").unwrap().is_room_command());
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("gm"), Err(CommandParseError::NotACommand));
        assert_eq!(parse_command("   "), Err(CommandParseError::NotACommand));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/pause"),
            Err(CommandParseError::UnknownCommand("/pause".into()))
        );
    }

    #[test]
    fn room_commands_are_gated_set() {
        assert!(parse_command("/watch").unwrap().is_room_command());
        assert!(parse_command("/oracle").unwrap().is_room_command());
        assert!(!parse_command("/balance").unwrap().is_room_command());
        assert!(!parse_command("/join abc").unwrap().is_room_command());
    }

    #[test]
    fn every_menu_entry_parses() {
        for (name, _) in bot_commands() {
            let text = match name {
                "join" => "/join abc".to_string(),
                "bet" => "/bet 1 YES".to_string(),
                other => format!("/{other}"),
            };
            assert_eq!(parse_command(&text).unwrap().name(), name);
        }
    }
}
