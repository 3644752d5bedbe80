//! Terminal output for CLI handlers.
//!
//! Every printer honours JSON mode (one `{"type", "payload"}` object per
//! line, for scripting) and quiet mode. Warnings and errors are printed even
//! when quiet.

use std::fmt::Display;
use std::sync::OnceLock;

use owo_colors::{OwoColorize, Stream, Style as Paint};
use parking_lot::RwLock;
use serde_json::{json, Value};
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Runtime output configuration shared by CLI handlers.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
    /// 0 = normal; each `-v` raises it by one.
    pub verbose: u8,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool, verbose: u8) -> Self {
        Self {
            json,
            quiet,
            verbose,
        }
    }

    const fn suppresses_text(self) -> bool {
        !self.json && self.quiet
    }
}

static OUTPUT_CONFIG: OnceLock<RwLock<OutputConfig>> = OnceLock::new();

fn current() -> OutputConfig {
    *OUTPUT_CONFIG
        .get_or_init(|| RwLock::new(OutputConfig::default()))
        .read()
}

/// How a line behaves under `--quiet`.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Level {
    Regular,
    Always,
}

/// Route one logical line to JSON or to the terminal.
fn emit(kind: &str, payload: Value, level: Level, text: impl FnOnce()) {
    let config = current();
    if config.json {
        println!("{}", json!({ "type": kind, "payload": payload }));
    } else if level == Level::Always || !config.suppresses_text() {
        text();
    }
}

fn paint(value: impl Display, stream: Stream, style: Paint) -> String {
    let value = value.to_string();
    if is_json() {
        return value;
    }
    value
        .if_supports_color(stream, |t| t.style(style))
        .to_string()
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    *OUTPUT_CONFIG
        .get_or_init(|| RwLock::new(OutputConfig::default()))
        .write() = config;
}

/// Force colors on or off; `None` restores terminal detection.
pub fn set_color(enabled: Option<bool>) {
    match enabled {
        Some(enabled) => owo_colors::set_override(enabled),
        None => owo_colors::unset_override(),
    }
}

#[must_use]
pub fn is_json() -> bool {
    current().json
}

#[must_use]
pub fn is_quiet() -> bool {
    current().quiet
}

#[must_use]
pub fn verbosity() -> u8 {
    current().verbose
}

/// Name and version banner for long-running commands.
pub fn header(version: &str) {
    emit(
        "header",
        json!({ "app": "pitboss", "version": version }),
        Level::Regular,
        || {
            println!(
                "{} {}\n",
                paint("pitboss", Stream::Stdout, Paint::new().bold()),
                muted(version)
            );
        },
    );
}

/// Print a labeled value.
pub fn field(label: &str, value: impl Display) {
    let value = value.to_string();
    emit(
        "field",
        json!({ "label": label, "value": value }),
        Level::Regular,
        || println!("  {:<14} {value}", muted(label)),
    );
}

pub fn success(message: &str) {
    emit("success", json!({ "message": message }), Level::Regular, || {
        println!("  {} {message}", positive("✓"));
    });
}

pub fn warning(message: &str) {
    emit("warning", json!({ "message": message }), Level::Always, || {
        println!(
            "  {} {message}",
            paint("⚠", Stream::Stdout, Paint::new().yellow())
        );
    });
}

/// Print an error line to stderr.
pub fn error(message: &str) {
    if is_json() {
        eprintln!("{}", json!({ "type": "error", "payload": { "message": message } }));
        return;
    }
    eprintln!(
        "  {} {message}",
        paint("×", Stream::Stderr, Paint::new().red())
    );
}

pub fn section(title: &str) {
    emit("section", json!({ "title": title }), Level::Regular, || {
        println!("\n{}", paint(title, Stream::Stdout, Paint::new().bold()));
    });
}

pub fn note(message: &str) {
    emit("note", json!({ "message": message }), Level::Regular, || {
        println!("  {}", muted(message));
    });
}

/// Print a follow-up suggestion.
pub fn hint(message: &str) {
    emit("hint", json!({ "message": message }), Level::Regular, || {
        println!("  {}: {}", highlight("hint"), muted(message));
    });
}

/// Render rows as a table, or as one `{"command", "data"}` object in JSON
/// mode.
pub fn table<T: Tabled>(command: &str, rows: Vec<T>, payload: Value) {
    let config = current();
    if config.json {
        json_output(json!({ "command": command, "data": payload }));
        return;
    }
    if config.suppresses_text() {
        return;
    }
    if rows.is_empty() {
        println!("  {}", muted("(none)"));
        return;
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    for line in table.to_string().lines() {
        println!("  {line}");
    }
}

/// Print a complete JSON document for commands with a structured result.
pub fn json_output(value: Value) {
    println!("{value}");
}

#[must_use]
pub fn positive(value: impl Display) -> String {
    paint(value, Stream::Stdout, Paint::new().green())
}

#[must_use]
pub fn negative(value: impl Display) -> String {
    paint(value, Stream::Stdout, Paint::new().red())
}

#[must_use]
pub fn highlight(value: impl Display) -> String {
    paint(value, Stream::Stdout, Paint::new().cyan())
}

#[must_use]
pub fn muted(value: impl Display) -> String {
    paint(value, Stream::Stdout, Paint::new().dimmed())
}
