//! Configuration and application access for one-shot CLI handlers.

use std::path::Path;

use super::output;
use crate::domain::{RoomId, UserId};
use crate::error::Result;
use crate::infrastructure::bootstrap::{build_app, App};
use crate::infrastructure::config::settings::Config;

/// Load and validate the configuration file.
pub fn load_config(path: &Path) -> Result<Config> {
    Config::load(path)
}

/// Load configuration and wire the application against its database.
///
/// Service logs are only shown with `-v`.
pub fn open_app(path: &Path) -> Result<App> {
    let config = load_config(path)?;
    if output::verbosity() > 0 {
        config.init_logging();
    }
    build_app(&config)
}

#[must_use]
pub fn room_id(raw: &str) -> RoomId {
    RoomId::from(raw.trim())
}

#[must_use]
pub fn user_id(raw: &str) -> UserId {
    UserId::from(raw.trim())
}
