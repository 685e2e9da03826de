//! Logging setup for ocbot using tracing.
//!
//! The bot writes a daily rolling file under the configured log directory as
//! well as stderr. One-shot subcommands only log to stderr.

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    ConsoleAndFile,
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must outlive the bot.
pub fn init(config: &LoggingConfig, output: LogOutput) -> Result<Option<WorkerGuard>> {
    let filter = build_filter(config, std::env::var(EnvFilter::DEFAULT_ENV).ok())?;

    let (file_layer, guard) = match output {
        LogOutput::Console => (None, None),
        LogOutput::ConsoleAndFile => {
            let log_dir = config.log_dir()?;
            std::fs::create_dir_all(&log_dir)
                .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

            let file_appender = tracing_appender::rolling::daily(&log_dir, "ocbot.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);
            (Some(layer), Some(guard))
        }
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(output == LogOutput::ConsoleAndFile);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    if output == LogOutput::ConsoleAndFile {
        tracing::info!("Logging to {}", config.log_dir()?.display());
    }

    Ok(guard)
}

/// `RUST_LOG` wins when it parses; otherwise the configured filter applies.
fn build_filter(config: &LoggingConfig, env: Option<String>) -> Result<EnvFilter> {
    if let Some(directives) = env.filter(|d| !d.trim().is_empty()) {
        match EnvFilter::try_new(&directives) {
            Ok(filter) => return Ok(filter),
            Err(e) => eprintln!("Ignoring invalid {}: {}", EnvFilter::DEFAULT_ENV, e),
        }
    }

    EnvFilter::try_new(&config.filter)
        .with_context(|| format!("Invalid logging.filter '{}'", config.filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_filter_applies_without_env() {
        let filter = build_filter(&LoggingConfig::default(), None).unwrap();
        assert!(filter.to_string().contains("ocbot=debug"));
    }

    #[test]
    fn env_overrides_configured_filter() {
        let filter = build_filter(&LoggingConfig::default(), Some("ocbot=trace".to_string())).unwrap();
        assert!(filter.to_string().contains("ocbot=trace"));
    }

    #[test]
    fn bad_env_falls_back_to_config() {
        let filter =
            build_filter(&LoggingConfig::default(), Some("ocbot=notalevel".to_string())).unwrap();
        assert!(filter.to_string().contains("ocbot=debug"));
    }

    #[test]
    fn bad_configured_filter_is_an_error() {
        let config = LoggingConfig {
            dir: None,
            filter: "ocbot=notalevel".to_string(),
        };
        assert!(build_filter(&config, None).is_err());
    }
}
