//! CLI module graph.

pub mod admin;
pub mod bet;
pub mod command;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod output;
pub mod pool;
pub mod room;
pub mod run;
pub mod wallet;
