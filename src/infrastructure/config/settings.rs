//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; secrets (`TELEGRAM_BOT_TOKEN`,
//! `PITBOSS_ADMIN_CHAT_ID`, `CRYPTOCOMPARE_API_KEY`, `PITBOSS_CUSTODY_TOKEN`)
//! only ever come from the environment.
//!
//! # Example
//!
//! ```no_run
//! use pitboss::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("pitboss.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use super::logging::LoggingConfig;
use super::service::{ChatConfig, FeeConfig, SchedulerSettings, TelegramAppConfig};
use crate::adapter::outbound::custody::CustodyConfig;
use crate::adapter::outbound::oracle::OracleConfig;
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Path to the SQLite database file.
    ///
    /// Defaults to "pitboss.db" in the current directory.
    #[serde(default = "default_database_path")]
    pub database: String,

    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Oracle timings and price feed endpoints.
    #[serde(default)]
    pub oracle: OracleConfig,

    #[serde(default)]
    pub fees: FeeConfig,

    /// Room chat behaviour.
    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub telegram: TelegramAppConfig,

    /// External custody service.
    #[serde(default)]
    pub custody: CustodyConfig,
}

fn default_database_path() -> String {
    "pitboss.db".to_string()
}

fn env_secret(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Parse configuration from TOML content and apply environment secrets.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.oracle.cryptocompare_api_key = env_secret("CRYPTOCOMPARE_API_KEY");
        config.custody.token = env_secret("PITBOSS_CUSTODY_TOKEN");
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Check that all values are within acceptable ranges.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "database" }.into());
        }
        if self.scheduler.deadline_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "deadline_interval_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.scheduler.instant_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "instant_interval_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.oracle.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "oracle.timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.custody.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "custody.timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }

        for (field, rate) in [
            ("protocol_rate", self.fees.protocol_rate),
            ("host_rate", self.fees.host_rate),
            ("referral_share", self.fees.referral_share),
        ] {
            if rate < Decimal::ZERO || rate >= Decimal::ONE {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be in [0, 1)".to_string(),
                }
                .into());
            }
        }
        if self.fees.protocol_rate + self.fees.host_rate >= Decimal::ONE {
            return Err(ConfigError::InvalidValue {
                field: "fees",
                reason: "protocol_rate + host_rate must be below 1".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rust_decimal_macros::dec;

    #[test]
    fn empty_file_is_a_valid_config() {
        let config = Config::parse_toml("").unwrap();
        assert_eq!(config.database, "pitboss.db");
        assert_eq!(config.scheduler.deadline_interval_secs, 5);
        assert_eq!(config.scheduler.instant_interval_secs, 3);
        assert_eq!(config.fees.protocol_rate, dec!(0.02));
        assert_eq!(config.chat.cooldown_secs, 5);
        assert!(!config.telegram.enabled);
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse_toml(
            r#"
            database = "/tmp/rooms.db"

            [logging]
            level = "debug"
            format = "json"

            [scheduler]
            deadline_interval_secs = 10

            [fees]
            host_rate = 0.015
            "#,
        )
        .unwrap();
        assert_eq!(config.database, "/tmp/rooms.db");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.scheduler.deadline_interval_secs, 10);
        assert_eq!(config.scheduler.instant_interval_secs, 3);
        assert_eq!(config.fees.host_rate, dec!(0.015));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = Config::parse_toml("[scheduler]\ninstant_interval_secs = 0").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "instant_interval_secs",
                ..
            })
        ));
    }

    #[test]
    fn fee_rates_must_leave_a_payout() {
        let err = Config::parse_toml("[fees]\nprotocol_rate = 0.6\nhost_rate = 0.5").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { field: "fees", .. })
        ));

        let err = Config::parse_toml("[fees]\nreferral_share = 1").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "referral_share",
                ..
            })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::parse_toml("[scheduler").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
