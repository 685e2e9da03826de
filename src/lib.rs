//! ocbot library root.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod runner;
pub mod store;
pub mod telegram;

pub use cli::Commands;
pub use config::{load_settings, Settings};
pub use dispatch::{AttachmentResolver, Dispatcher, InboundEvent};
pub use error::{Error, Result};
pub use runner::{CommandRunner, ProcessRunner};
pub use store::{CredentialStore, FileCredentialStore};
pub use telegram::run_bot;
