//! A wired application over fakes.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use super::fakes::{MemoryCustody, RecordingChannel, RecordingNotifier, StaticOracle};
use crate::adapter::outbound::sqlite::database::connection::{create_pool_with, SqlitePragmas};
use crate::adapter::outbound::sqlite::{run_migrations, DbPool};
use crate::application::OracleSettings;
use crate::domain::{ChatRef, User};
use crate::error::Result;
use crate::infrastructure::bootstrap::{Adapters, App, AppSettings};
use crate::port::outbound::NotifierRegistry;

/// Application plus handles on every fake it was built with.
pub struct TestApp {
    pub app: Arc<App>,
    pub oracle: StaticOracle,
    pub channel: RecordingChannel,
    pub notifier: RecordingNotifier,
    pub custody: MemoryCustody,
}

/// Settings with short oracle timings.
#[must_use]
pub fn fast_settings() -> AppSettings {
    AppSettings {
        oracle: OracleSettings {
            timeout: Duration::from_millis(500),
            retry_delay: Duration::from_millis(1),
        },
        ..AppSettings::default()
    }
}

/// A migrated single-connection in-memory database.
pub fn memory_pool() -> Result<DbPool> {
    let pool = create_pool_with(":memory:", 1, SqlitePragmas::default())?;
    run_migrations(&pool)?;
    Ok(pool)
}

impl TestApp {
    /// In-memory database with default fakes.
    pub fn new() -> Result<Self> {
        Ok(Self::with_pool(memory_pool()?, &fast_settings()))
    }

    /// Wire over an existing migrated pool.
    #[must_use]
    pub fn with_pool(pool: DbPool, settings: &AppSettings) -> Self {
        let oracle = StaticOracle::new();
        let channel = RecordingChannel::new();
        let notifier = RecordingNotifier::new();
        let custody = MemoryCustody::new();

        let mut registry = NotifierRegistry::new();
        registry.register(Box::new(notifier.clone()));
        let adapters = Adapters {
            oracle: Arc::new(oracle.clone()),
            channel: Arc::new(channel.clone()),
            custody: Arc::new(custody.clone()),
            notifier: registry,
        };

        Self {
            app: Arc::new(App::assemble(pool, adapters, settings)),
            oracle,
            channel,
            notifier,
            custody,
        }
    }

    /// Create a user and credit `balance`.
    pub async fn funded_user(&self, external_ref: &str, balance: Decimal) -> Result<User> {
        let user = self
            .app
            .wallet
            .get_or_create_user(external_ref, None, None)
            .await?;
        if balance > Decimal::ZERO {
            self.app.wallet.deposit(&user.id, balance, None).await?;
        }
        self.app.wallet.user(&user.id).await
    }

    /// Register `n` chats named `chat-0`, `chat-1`, ...
    pub async fn provision_chats(&self, n: usize) -> Result<Vec<ChatRef>> {
        let mut chats = Vec::with_capacity(n);
        for i in 0..n {
            let chat = ChatRef::new(format!("chat-{i}"));
            self.app.chats.provision(&chat).await?;
            chats.push(chat);
        }
        Ok(chats)
    }
}
