//! Handler for the `config` command group.

use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::{context, output};
use crate::error::Result;

/// Execute `config validate`.
pub fn execute_validate(path: &Path) -> Result<()> {
    let config = context::load_config(path)?;

    if output::is_json() {
        output::json_output(json!({
            "command": "config.validate",
            "valid": true,
            "path": path.display().to_string(),
        }));
        return Ok(());
    }

    output::section("Configuration");
    output::success("Configuration is valid");
    output::field("Path", path.display());
    output::field("Database", &config.database);
    output::field("Oracle timeout", format!("{}ms", config.oracle.timeout_ms));
    output::field("Telegram", config.telegram.enabled);
    if config.oracle.cryptocompare_api_key.is_none() {
        output::note("CRYPTOCOMPARE_API_KEY not set; price lookups start at Binance");
    }
    Ok(())
}
