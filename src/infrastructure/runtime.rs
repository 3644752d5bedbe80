//! Long-running service lifecycle.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use super::bootstrap::{build_app, App};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;

/// Run until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
        let _ = shutdown_tx.send(true);
    });
    run_with_shutdown(config, shutdown_rx).await
}

/// Run with an externally controlled shutdown signal.
pub async fn run_with_shutdown(config: Config, shutdown: watch::Receiver<bool>) -> Result<()> {
    info!(
        database = %config.database,
        telegram = config.telegram.enabled,
        "Starting pitboss"
    );
    let app = Arc::new(build_app(&config)?);
    serve(&app, &config, shutdown).await
}

/// Start the scheduler (and the bot listener when enabled), then wait for
/// shutdown. In-flight settlement passes finish before this returns.
pub async fn serve(app: &Arc<App>, config: &Config, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let scheduler = app.scheduler().start();

    #[cfg(feature = "telegram")]
    let listener = spawn_listener(app, config);
    #[cfg(not(feature = "telegram"))]
    let _ = config;

    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            break;
        }
    }

    #[cfg(feature = "telegram")]
    if let Some(handle) = listener {
        handle.abort();
    }
    scheduler.shutdown().await;
    info!("pitboss stopped");
    Ok(())
}

#[cfg(feature = "telegram")]
fn spawn_listener(app: &Arc<App>, config: &Config) -> Option<tokio::task::JoinHandle<()>> {
    use crate::adapter::inbound::telegram::{listener, CommandHandler};
    use crate::adapter::outbound::telegram::TelegramConfig;

    if !config.telegram.enabled {
        return None;
    }
    let tg_config = TelegramConfig::from_env()?;
    let handler = Arc::new(CommandHandler::new(
        Arc::clone(&app.rooms),
        Arc::clone(&app.wallet),
        Arc::clone(&app.chats),
        Arc::clone(&app.resolver),
        Arc::clone(&app.sessions),
        app.settler.fees(),
    ));
    let bot = teloxide::Bot::new(&tg_config.bot_token);
    Some(tokio::spawn(listener::listen(bot, handler)))
}
