//! Configuration loading for ocbot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

pub const ENV_TELEGRAM_TOKEN: &str = "OCBOT_TELEGRAM_TOKEN";
pub const ENV_SCRATCH_DIR: &str = "OCBOT_SCRATCH_DIR";
pub const ENV_CLI_PATH: &str = "OCBOT_CLI_PATH";

/// Get the ocbot home directory (~/.ocbot).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".ocbot"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.ocbot/settings.json, then apply environment overrides.
///
/// A missing settings file is not an error; every field has a default.
pub fn load_settings() -> Result<Settings> {
    let path = get_settings_path()?;

    let mut settings = if path.exists() {
        let content = std::fs::read_to_string(&path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        tracing::debug!("Loaded settings from {}", path.display());
        settings
    } else {
        tracing::debug!("No settings file at {}, using defaults", path.display());
        Settings::default()
    };

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    validate_settings(&settings)?;

    Ok(settings)
}

fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_empty(ENV_TELEGRAM_TOKEN) {
        settings.telegram.bot_token = Some(token);
    }
    if let Some(dir) = non_empty(ENV_SCRATCH_DIR) {
        settings.store.scratch_dir = Some(PathBuf::from(dir));
    }
    if let Some(cli) = non_empty(ENV_CLI_PATH) {
        settings.exec.cli_path = cli;
    }
}

fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.exec.cli_path.trim().is_empty() {
        return Err(Error::Config("exec.cli_path must not be empty".to_string()));
    }
    if settings.exec.timeout_secs == Some(0) {
        return Err(Error::Config(
            "exec.timeout_secs must be greater than zero when set".to_string(),
        ));
    }
    if settings.telegram.max_attachment_bytes == 0 {
        return Err(Error::Config(
            "telegram.max_attachment_bytes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

/// Telegram channel configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    #[serde(default = "default_max_attachment_bytes")]
    pub max_attachment_bytes: u64,
}

fn default_max_attachment_bytes() -> u64 {
    1024 * 1024
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            max_attachment_bytes: default_max_attachment_bytes(),
        }
    }
}

/// What happens to a credential file once a newer upload replaces it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Superseded files stay on disk until external cleanup.
    #[default]
    Retain,
    /// Superseded files are deleted right after the mapping is swapped.
    RemoveSuperseded,
}

/// Credential store configuration.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StoreConfig {
    /// Directory for credential files. Defaults to the OS temp dir.
    pub scratch_dir: Option<PathBuf>,
    #[serde(default)]
    pub retention: RetentionPolicy,
}

impl StoreConfig {
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

/// External CLI configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExecConfig {
    #[serde(default = "default_cli_path")]
    pub cli_path: String,
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_validate_credentials")]
    pub validate_credentials: bool,
}

fn default_cli_path() -> String {
    "oc".to_string()
}

fn default_validate_credentials() -> bool {
    true
}

impl ExecConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
            timeout_secs: None,
            validate_credentials: default_validate_credentials(),
        }
    }
}

/// Logging configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LoggingConfig {
    /// Directory for the rolling log file. Defaults to ~/.ocbot/logs.
    pub dir: Option<PathBuf>,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info,ocbot=debug".to_string()
}

impl LoggingConfig {
    pub fn log_dir(&self) -> Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(get_home_dir()?.join("logs")),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            filter: default_log_filter(),
        }
    }
}

/// ocbot settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub exec: ExecConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    /// Copy of the settings safe to print: the bot token is masked.
    pub fn redacted(&self) -> Settings {
        let mut copy = self.clone();
        if copy.telegram.bot_token.is_some() {
            copy.telegram.bot_token = Some("***".to_string());
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.exec.cli_path, "oc");
        assert!(settings.exec.validate_credentials);
        assert_eq!(settings.exec.timeout(), None);
        assert_eq!(settings.store.retention, RetentionPolicy::Retain);
        assert_eq!(settings.telegram.max_attachment_bytes, 1024 * 1024);
        assert_eq!(settings.logging.filter, "info,ocbot=debug");
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn retention_uses_snake_case() {
        let settings: Settings =
            serde_json::from_str(r#"{"store": {"retention": "remove_superseded"}}"#).unwrap();
        assert_eq!(settings.store.retention, RetentionPolicy::RemoveSuperseded);
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut settings = Settings::default();
        apply_env_overrides(&mut settings, |key| match key {
            ENV_TELEGRAM_TOKEN => Some("123:abc".to_string()),
            ENV_SCRATCH_DIR => Some("/var/tmp/ocbot".to_string()),
            ENV_CLI_PATH => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(settings.telegram.bot_token.as_deref(), Some("123:abc"));
        assert_eq!(settings.store.scratch_dir(), PathBuf::from("/var/tmp/ocbot"));
        // blank values are ignored
        assert_eq!(settings.exec.cli_path, "oc");
    }

    #[test]
    fn log_dir_follows_settings() {
        let settings: Settings =
            serde_json::from_str(r#"{"logging": {"dir": "/var/log/ocbot"}}"#).unwrap();
        assert_eq!(settings.logging.log_dir().unwrap(), PathBuf::from("/var/log/ocbot"));
        assert_eq!(settings.logging.filter, "info,ocbot=debug");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut settings = Settings::default();
        settings.exec.timeout_secs = Some(0);
        assert!(matches!(validate_settings(&settings), Err(Error::Config(_))));
    }

    #[test]
    fn redacted_masks_token() {
        let mut settings = Settings::default();
        settings.telegram.bot_token = Some("secret".to_string());
        assert_eq!(settings.redacted().telegram.bot_token.as_deref(), Some("***"));
        assert_eq!(Settings::default().redacted().telegram.bot_token, None);
    }
}
