//! Handlers for the `pool` command group.

use std::path::Path;

use serde_json::json;
use tabled::Tabled;

use crate::adapter::inbound::cli::{context, output};
use crate::domain::{ChatPoolEntry, ChatRef};
use crate::error::Result;

#[derive(Tabled)]
struct SlotRow {
    #[tabled(rename = "Chat")]
    chat: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Room")]
    room: String,
}

impl From<&ChatPoolEntry> for SlotRow {
    fn from(entry: &ChatPoolEntry) -> Self {
        Self {
            chat: entry.chat.to_string(),
            status: entry.status.to_string(),
            room: entry
                .room_id
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string),
        }
    }
}

/// Execute `pool add`.
pub async fn execute_add(config: &Path, chat: &str) -> Result<()> {
    let app = context::open_app(config)?;
    let entry = app.chats.provision(&ChatRef::new(chat.trim())).await?;

    if output::is_json() {
        output::json_output(json!({ "command": "pool.add", "entry": entry }));
        return Ok(());
    }
    output::success(&format!("Chat {} added", output::highlight(&entry.chat)));
    output::field("Status", entry.status);
    Ok(())
}

/// Execute `pool list`.
pub async fn execute_list(config: &Path) -> Result<()> {
    let app = context::open_app(config)?;
    let slots = app.chats.slots().await?;

    output::section(&format!("Chat pool ({})", slots.len()));
    let rows = slots.iter().map(SlotRow::from).collect();
    output::table("pool.list", rows, json!(slots));
    Ok(())
}
