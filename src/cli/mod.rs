//! CLI commands for ocbot using clap.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{get_settings_path, load_settings, LoggingConfig};
use crate::dispatch::kubeconfig;
use crate::logging::{self, LogOutput};

/// ocbot - run oc/kubectl from chat with per-conversation kubeconfigs.
#[derive(Parser)]
#[command(name = "ocbot")]
#[command(version = "0.1.0")]
#[command(about = "Chat bot for running oc/kubectl against uploaded kubeconfigs", long_about = None)]
pub struct Commands {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the Telegram bot
    Run,

    /// Check that a local file is a well-formed kubeconfig
    Validate {
        /// Path to the kubeconfig file
        path: PathBuf,
    },

    /// Show the effective configuration
    Config,
}

impl Commands {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Run => {
                let settings = load_settings()?;
                let _guard = logging::init(&settings.logging, LogOutput::ConsoleAndFile)?;
                crate::telegram::run_bot(settings).await?;
                Ok(())
            }
            Command::Validate { path } => {
                logging::init(&LoggingConfig::default(), LogOutput::Console)?;
                validate_file(&path)
            }
            Command::Config => {
                let settings = load_settings()?;
                logging::init(&settings.logging, LogOutput::Console)?;
                show_config(&settings)
            }
        }
    }
}

fn validate_file(path: &PathBuf) -> Result<()> {
    let content =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    kubeconfig::validate(&content)?;
    println!("{} is a valid kubeconfig", path.display());
    Ok(())
}

fn show_config(settings: &crate::config::Settings) -> Result<()> {
    println!("Settings file: {}", get_settings_path()?.display());
    println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::io::Write;

    #[test]
    fn cli_definition_is_consistent() {
        Commands::command().debug_assert();
    }

    #[test]
    fn parses_validate() {
        let cmds = Commands::try_parse_from(["ocbot", "validate", "/tmp/kc"]).unwrap();
        assert!(matches!(cmds.command, Command::Validate { path } if path == PathBuf::from("/tmp/kc")));
    }

    #[test]
    fn validate_file_reports_bad_documents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"kind: Config\n").unwrap();
        assert!(validate_file(&file.path().to_path_buf()).is_err());

        let missing = PathBuf::from("/nonexistent/ocbot/kubeconfig");
        assert!(validate_file(&missing).is_err());
    }
}
