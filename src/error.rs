//! Error types for ocbot.
//!
//! The `Display` text of each variant is what the user sees as the bot's
//! reply, so keep the messages short and free of internal detail.

use std::process::ExitStatus;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No credential registered for the conversation.
    #[error("no valid credential was found")]
    NotFound,

    /// Upload requested but no file or snippet could be resolved.
    #[error("please provide a valid credential file or snippet")]
    NoAttachment,

    #[error("invalid credential file: {0}")]
    InvalidCredential(String),

    /// The executable could not be started (missing, permission denied, timeout).
    #[error("{0}")]
    ProcessInvocation(String),

    /// The executable ran and exited unsuccessfully.
    #[error("{status}")]
    CommandFailed { status: ExitStatus, output: String },

    #[error("invalid command")]
    InvalidCommand,

    #[error("Telegram error: {0}")]
    Telegram(String),

    #[error("Download error: {0}")]
    Download(String),
}
