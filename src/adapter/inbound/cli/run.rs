//! Handler for the `run` command.

use std::path::Path;

use crate::adapter::inbound::cli::{context, output};
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::runtime;

/// Execute the run command.
pub async fn execute(config_path: &Path) -> Result<()> {
    let config = context::load_config(config_path)?;
    config.init_logging();

    if !output::is_quiet() {
        print_startup(&config);
    }

    runtime::run(config).await
}

fn print_startup(config: &Config) {
    output::header(env!("CARGO_PKG_VERSION"));
    output::field("Database", &config.database);
    output::field(
        "Deadline loop",
        format!("every {}s", config.scheduler.deadline_interval_secs),
    );
    output::field(
        "Instant loop",
        format!("every {}s", config.scheduler.instant_interval_secs),
    );
    output::field(
        "Fees",
        format!(
            "protocol {} / host {} / referral {}",
            config.fees.protocol_rate, config.fees.host_rate, config.fees.referral_share
        ),
    );
    output::field(
        "Telegram",
        if config.telegram.enabled {
            output::positive("enabled")
        } else {
            output::muted("disabled")
        },
    );
    if output::verbosity() > 0 {
        output::field("Oracle timeout", format!("{}ms", config.oracle.timeout_ms));
        output::field("Cooldown", format!("{}s", config.chat.cooldown_secs));
    }
    output::hint("press Ctrl-C to stop");
}
