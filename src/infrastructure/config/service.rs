//! Service configuration for the scheduler, fees, room chats and Telegram.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::SchedulerConfig;
use crate::domain::FeeSchedule;

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSettings {
    /// Deadline sweep period in seconds.
    #[serde(default = "default_deadline_interval_secs")]
    pub deadline_interval_secs: u64,
    /// Instant-target sweep period in seconds.
    #[serde(default = "default_instant_interval_secs")]
    pub instant_interval_secs: u64,
    /// How long an unresolvable room stays quiet after its alert.
    #[serde(default = "default_manual_alert_secs")]
    pub manual_alert_secs: u64,
}

const fn default_deadline_interval_secs() -> u64 {
    5
}

const fn default_instant_interval_secs() -> u64 {
    3
}

const fn default_manual_alert_secs() -> u64 {
    24 * 60 * 60
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            deadline_interval_secs: default_deadline_interval_secs(),
            instant_interval_secs: default_instant_interval_secs(),
            manual_alert_secs: default_manual_alert_secs(),
        }
    }
}

impl From<&SchedulerSettings> for SchedulerConfig {
    fn from(settings: &SchedulerSettings) -> Self {
        Self {
            deadline_interval: Duration::from_secs(settings.deadline_interval_secs),
            instant_interval: Duration::from_secs(settings.instant_interval_secs),
        }
    }
}

/// `[fees]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct FeeConfig {
    #[serde(default = "default_protocol_rate")]
    pub protocol_rate: Decimal,
    #[serde(default = "default_host_rate")]
    pub host_rate: Decimal,
    /// Share of the protocol fee paid to referrers.
    #[serde(default = "default_referral_share")]
    pub referral_share: Decimal,
}

fn default_protocol_rate() -> Decimal {
    Decimal::new(2, 2) // 2%
}

fn default_host_rate() -> Decimal {
    Decimal::new(1, 2) // 1%
}

fn default_referral_share() -> Decimal {
    Decimal::new(5, 2) // 5%
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            protocol_rate: default_protocol_rate(),
            host_rate: default_host_rate(),
            referral_share: default_referral_share(),
        }
    }
}

impl From<&FeeConfig> for FeeSchedule {
    fn from(config: &FeeConfig) -> Self {
        Self {
            protocol_rate: config.protocol_rate,
            host_rate: config.host_rate,
            referral_share: config.referral_share,
        }
    }
}

/// `[chat]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Per (room, user, command) cooldown in seconds.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

const fn default_cooldown_secs() -> u64 {
    5
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

/// `[telegram]` section. The bot token comes from `TELEGRAM_BOT_TOKEN`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramAppConfig {
    #[serde(default)]
    pub enabled: bool,
}
