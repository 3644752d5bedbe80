//! Top-level command dispatch.

use super::command::{
    AdminCommand, BetCommand, Cli, ColorChoice, Commands, ConfigCommand, PoolCommand,
    RoomCommand, WalletCommand,
};

use super::{admin, bet, config, output, pool, room, run, wallet};
use crate::domain::WagerStage;
use crate::error::Result;

/// Apply global flags and run the selected command.
pub async fn execute(cli: Cli) -> Result<()> {
    output::configure(output::OutputConfig::new(cli.json, cli.quiet, cli.verbose));
    output::set_color(match cli.color {
        ColorChoice::Auto => None,
        ColorChoice::Always => Some(true),
        ColorChoice::Never => Some(false),
    });

    let config = cli.config.as_path();
    match cli.command {
        Commands::Run => run::execute(config).await,
        Commands::Room(command) => match command {
            RoomCommand::Create(args) => room::execute_create(config, &args, false).await,
            RoomCommand::Queue(args) => room::execute_create(config, &args, true).await,
            RoomCommand::List(args) => room::execute_list(config, &args).await,
            RoomCommand::Show(arg) => room::execute_show(config, &arg.room).await,
            RoomCommand::Launch(arg) => room::execute_launch(config, &arg.room).await,
        },
        Commands::Bet(command) => match command {
            BetCommand::Place(args) => bet::execute(config, &args, WagerStage::Open).await,
            BetCommand::JoinQueue(args) => bet::execute(config, &args, WagerStage::Queue).await,
        },
        Commands::Admin(command) => match command {
            AdminCommand::Resolve(args) => admin::execute_resolve(config, &args, false).await,
            AdminCommand::ForceSettle(args) => admin::execute_resolve(config, &args, true).await,
            AdminCommand::ManualQueue => admin::execute_manual_queue(config).await,
        },
        Commands::Pool(command) => match command {
            PoolCommand::Add { chat } => pool::execute_add(config, &chat).await,
            PoolCommand::List => pool::execute_list(config).await,
        },
        Commands::Wallet(command) => match command {
            WalletCommand::Create(args) => wallet::execute_create(config, &args).await,
            WalletCommand::Deposit(args) => wallet::execute_deposit(config, &args).await,
            WalletCommand::Withdraw(args) => wallet::execute_withdraw(config, &args).await,
            WalletCommand::Balance(arg) => wallet::execute_balance(config, &arg.user).await,
            WalletCommand::History(args) => wallet::execute_history(config, &args).await,
            WalletCommand::Bets(args) => wallet::execute_bets(config, &args).await,
            WalletCommand::Won(args) => wallet::execute_won(config, &args).await,
            WalletCommand::Referrals(arg) => wallet::execute_referrals(config, &arg.user).await,
        },
        Commands::Config(ConfigCommand::Validate) => config::execute_validate(config),
    }
}
