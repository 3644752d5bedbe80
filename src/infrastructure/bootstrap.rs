//! Composition root: builds stores, adapters and services from configuration.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::adapter::outbound::custody::HttpCustody;
use crate::adapter::outbound::oracle::HttpPriceOracle;
use crate::adapter::outbound::sqlite::{
    create_pool, run_migrations, DbPool, SqliteChatPoolStore, SqliteLedgerStore,
    SqliteRoomStore, SqliteSessionStore,
};
use crate::application::{
    ChatCoordinator, Cooldown, DeadlineLoop, InstantTargetLoop, OracleResolver, OracleSettings,
    RoomService, SchedulerConfig, SettlementScheduler, Settler, WalletService,
};
use crate::domain::FeeSchedule;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::{
    ChannelProvider, ChatPoolStore, Custody, LedgerStore, LogNotifier, NotifierRegistry,
    NullChannel, PriceOracle, RoomStore, SessionStore,
};

/// Service tunables derived from [`Config`].
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub fees: FeeSchedule,
    pub oracle: OracleSettings,
    pub cooldown: chrono::Duration,
    pub manual_alert_window: chrono::Duration,
    pub scheduler: SchedulerConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            oracle: OracleSettings::default(),
            cooldown: chrono::Duration::seconds(5),
            manual_alert_window: chrono::Duration::hours(24),
            scheduler: SchedulerConfig::default(),
        }
    }
}

fn seconds(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
}

impl From<&Config> for AppSettings {
    fn from(config: &Config) -> Self {
        Self {
            fees: FeeSchedule::from(&config.fees),
            oracle: OracleSettings {
                timeout: Duration::from_millis(config.oracle.timeout_ms),
                retry_delay: Duration::from_millis(config.oracle.retry_delay_ms),
            },
            cooldown: seconds(config.chat.cooldown_secs),
            manual_alert_window: seconds(config.scheduler.manual_alert_secs),
            scheduler: SchedulerConfig::from(&config.scheduler),
        }
    }
}

/// External collaborators the services are built on.
pub struct Adapters {
    pub oracle: Arc<dyn PriceOracle>,
    pub channel: Arc<dyn ChannelProvider>,
    pub custody: Arc<dyn Custody>,
    pub notifier: NotifierRegistry,
}

/// Fully wired application.
pub struct App {
    pub room_store: Arc<dyn RoomStore>,
    pub ledger: Arc<dyn LedgerStore>,
    pub chat_pool: Arc<dyn ChatPoolStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub notifier: Arc<NotifierRegistry>,
    pub resolver: Arc<OracleResolver>,
    pub chats: Arc<ChatCoordinator>,
    pub settler: Arc<Settler>,
    pub rooms: Arc<RoomService>,
    pub wallet: Arc<WalletService>,
    pub deadline: Arc<DeadlineLoop>,
    pub instant: Arc<InstantTargetLoop>,
    scheduler: SchedulerConfig,
}

impl App {
    /// Wire services over a migrated pool.
    pub fn assemble(pool: DbPool, adapters: Adapters, settings: &AppSettings) -> Self {
        let room_store: Arc<dyn RoomStore> = Arc::new(SqliteRoomStore::new(pool.clone()));
        let ledger: Arc<dyn LedgerStore> = Arc::new(SqliteLedgerStore::new(pool.clone()));
        let chat_pool: Arc<dyn ChatPoolStore> = Arc::new(SqliteChatPoolStore::new(pool.clone()));
        let sessions: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::new(pool));
        let notifier = Arc::new(adapters.notifier);

        let resolver = Arc::new(OracleResolver::new(adapters.oracle, settings.oracle));
        let chats = Arc::new(ChatCoordinator::new(
            Arc::clone(&chat_pool),
            Arc::clone(&room_store),
            Arc::clone(&ledger),
            adapters.channel,
            Arc::clone(&notifier),
            Cooldown::new(Arc::clone(&sessions), settings.cooldown),
        ));
        let settler = Arc::new(Settler::new(
            Arc::clone(&room_store),
            Arc::clone(&ledger),
            Arc::clone(&resolver),
            Arc::clone(&chats),
            Arc::clone(&notifier),
            settings.fees,
        ));
        let rooms = Arc::new(RoomService::new(
            Arc::clone(&room_store),
            Arc::clone(&ledger),
            Arc::clone(&chats),
            Arc::clone(&settler),
        ));
        let wallet = Arc::new(WalletService::new(
            Arc::clone(&ledger),
            Arc::clone(&room_store),
            adapters.custody,
        ));
        let deadline = Arc::new(DeadlineLoop::new(
            Arc::clone(&room_store),
            Arc::clone(&settler),
            Arc::clone(&sessions),
            Arc::clone(&notifier),
            settings.manual_alert_window,
        ));
        let instant = Arc::new(InstantTargetLoop::new(
            Arc::clone(&room_store),
            Arc::clone(&settler),
        ));

        Self {
            room_store,
            ledger,
            chat_pool,
            sessions,
            notifier,
            resolver,
            chats,
            settler,
            rooms,
            wallet,
            deadline,
            instant,
            scheduler: settings.scheduler,
        }
    }

    /// A scheduler over this app's loops, not yet started.
    #[must_use]
    pub fn scheduler(&self) -> SettlementScheduler {
        SettlementScheduler::new(
            self.scheduler,
            Arc::clone(&self.deadline),
            Arc::clone(&self.instant),
            Arc::clone(&self.sessions),
        )
    }
}

/// Open (creating if needed) and migrate the database.
pub fn open_database(path: &str) -> Result<DbPool> {
    let pool = create_pool(path)?;
    run_migrations(&pool)?;
    info!(database = %path, "Database initialized");
    Ok(pool)
}

/// Build notifier registry from configuration.
pub(crate) fn build_notifier_registry(config: &Config) -> NotifierRegistry {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));

    #[cfg(feature = "telegram")]
    if config.telegram.enabled {
        use crate::adapter::outbound::telegram::{TelegramConfig, TelegramNotifier};

        if let Some(tg_config) = TelegramConfig::from_env() {
            let bot = teloxide::Bot::new(&tg_config.bot_token);
            registry.register(Box::new(TelegramNotifier::new(bot, &tg_config)));
            info!("Telegram notifier enabled");
        } else {
            warn!("Telegram enabled but TELEGRAM_BOT_TOKEN not set");
        }
    }
    #[cfg(not(feature = "telegram"))]
    if config.telegram.enabled {
        warn!("Telegram enabled in config but the binary was built without it");
    }

    registry
}

fn build_channel(config: &Config) -> Arc<dyn ChannelProvider> {
    #[cfg(feature = "telegram")]
    if config.telegram.enabled {
        use crate::adapter::outbound::telegram::{TelegramChannel, TelegramConfig};

        if let Some(tg_config) = TelegramConfig::from_env() {
            return Arc::new(TelegramChannel::new(teloxide::Bot::new(&tg_config.bot_token)));
        }
    }
    let _ = config;
    Arc::new(NullChannel)
}

/// Production adapters for `config`.
pub fn build_adapters(config: &Config) -> Adapters {
    Adapters {
        oracle: Arc::new(HttpPriceOracle::new(config.oracle.clone())),
        channel: build_channel(config),
        custody: Arc::new(HttpCustody::new(config.custody.clone())),
        notifier: build_notifier_registry(config),
    }
}

/// Open the database and wire the application with production adapters.
pub fn build_app(config: &Config) -> Result<App> {
    let pool = open_database(&config.database)?;
    let adapters = build_adapters(config);
    info!(notifiers = adapters.notifier.len(), "Notifiers initialized");
    Ok(App::assemble(pool, adapters, &AppSettings::from(config)))
}
