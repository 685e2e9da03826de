//! ocbot - chat bot running oc/kubectl against per-conversation kubeconfigs.

use clap::Parser;
use std::process::ExitCode;

use ocbot::Commands;

#[tokio::main]
async fn main() -> ExitCode {
    // Logging is set up per subcommand once settings are known.
    match Commands::parse().run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
