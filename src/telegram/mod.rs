//! Telegram bot integration.

pub mod attachments;
pub mod client;
pub mod render;

pub use client::run_bot;
