//! External CLI invocation.
//!
//! Runs the cluster CLI with an argument vector, waits for it, and captures
//! its combined output in the order it was written. No timeout is applied
//! unless one is configured.

use async_trait::async_trait;
use std::io::Read;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Captured output of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub output: String,
}

/// Capability to run an external command to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`.
    ///
    /// Fails with [`Error::ProcessInvocation`] when the program cannot be
    /// started and with [`Error::CommandFailed`] when it exits nonzero.
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs commands as child processes of the bot.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        // stdout and stderr share one pipe so their lines stay interleaved.
        let (mut reader, writer) = std::io::pipe().map_err(|e| {
            Error::ProcessInvocation(format!("failed to create output pipe: {}", e))
        })?;
        let stderr_writer = writer.try_clone().map_err(|e| {
            Error::ProcessInvocation(format!("failed to create output pipe: {}", e))
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .kill_on_drop(true);

        tracing::debug!("Running {} with {} argument(s)", program, args.len());

        let spawned = cmd.spawn();
        // Release our copies of the write end, or the reader never sees EOF.
        drop(cmd);

        let mut child = spawned.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ProcessInvocation(format!("executable not found: {}", program))
            } else {
                Error::ProcessInvocation(format!("failed to start {}: {}", program, e))
            }
        })?;

        let collect = tokio::task::spawn_blocking(move || {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).map(|_| buf)
        });

        let finished = async {
            let status = child.wait().await?;
            let bytes = collect
                .await
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))??;
            Ok::<_, std::io::Error>((status, bytes))
        };

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, finished).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("{} timed out after {}s", program, limit.as_secs());
                    return Err(Error::ProcessInvocation(format!(
                        "{} timed out after {}s",
                        program,
                        limit.as_secs()
                    )));
                }
            },
            None => finished.await,
        };

        let (status, bytes) = waited
            .map_err(|e| Error::ProcessInvocation(format!("failed to wait for {}: {}", program, e)))?;
        let output = String::from_utf8_lossy(&bytes).into_owned();

        if status.success() {
            Ok(CommandOutput { output })
        } else {
            tracing::info!("{} exited with {}", program, status);
            Err(Error::CommandFailed { status, output })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_executable_is_invocation_error() {
        let runner = ProcessRunner::new();
        let err = runner
            .run("ocbot-definitely-not-installed", &[])
            .await
            .unwrap_err();

        match err {
            Error::ProcessInvocation(msg) => {
                assert!(msg.contains("executable not found"), "got {}", msg)
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_and_stderr_stay_interleaved() {
        let runner = ProcessRunner::new();
        let args = vec![
            "-c".to_string(),
            "echo one; echo two 1>&2; echo three; echo four 1>&2".to_string(),
        ];

        let out = runner.run("sh", &args).await.unwrap();
        assert_eq!(out.output, "one\ntwo\nthree\nfour\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_carries_output() {
        let runner = ProcessRunner::new();
        let args = vec![
            "-c".to_string(),
            "echo 'error: forbidden' 1>&2; exit 3".to_string(),
        ];

        match runner.run("sh", &args).await.unwrap_err() {
            Error::CommandFailed { status, output } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(output, "error: forbidden\n");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_aborts_hung_command() {
        let runner = ProcessRunner::with_timeout(Some(Duration::from_millis(200)));
        let args = vec!["-c".to_string(), "exec sleep 5".to_string()];

        let err = runner.run("sh", &args).await.unwrap_err();
        assert!(matches!(err, Error::ProcessInvocation(ref msg) if msg.contains("timed out")));
    }
}
