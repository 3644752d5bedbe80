//! Driving adapters: the operator CLI and the chat command listener.

pub mod cli;
pub mod telegram;
