//! Command dispatcher.
//!
//! Turns one inbound mention into either a credential upload or a CLI run,
//! and the outcome into the single reply string posted back to the chat.

use async_trait::async_trait;
use std::sync::Arc;

pub mod intent;
pub mod kubeconfig;
pub mod reply;

pub use intent::{CommandIntent, IntentKind, Recognizer};

use crate::config::ExecConfig;
use crate::error::{Error, Result};
use crate::runner::CommandRunner;
use crate::store::CredentialStore;

/// Confirmation posted after a successful upload.
pub const UPLOAD_OK: &str = "config file is successfully uploaded";

/// Opaque platform handle to a file attached to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef(pub String);

/// One inbound message as delivered by the chat platform.
#[derive(Debug, Clone, Default)]
pub struct InboundEvent {
    pub conversation_id: String,
    pub text: String,
    pub user_id: Option<String>,
    pub attachment: Option<AttachmentRef>,
    /// Set when the message was posted inside a thread.
    pub thread_marker: Option<String>,
}

/// Supplies the credential bytes for an upload request.
#[async_trait]
pub trait AttachmentResolver: Send + Sync {
    /// Raw bytes of the most relevant file or snippet for `event`, if any.
    async fn resolve(&self, event: &InboundEvent) -> Result<Option<Vec<u8>>>;
}

/// Dispatcher knobs, usually taken from [`ExecConfig`].
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub cli_path: String,
    pub validate_credentials: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from(&ExecConfig::default())
    }
}

impl From<&ExecConfig> for DispatchOptions {
    fn from(config: &ExecConfig) -> Self {
        Self {
            cli_path: config.cli_path.clone(),
            validate_credentials: config.validate_credentials,
        }
    }
}

pub struct Dispatcher {
    store: Arc<dyn CredentialStore>,
    runner: Arc<dyn CommandRunner>,
    recognizer: Recognizer,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        runner: Arc<dyn CommandRunner>,
        recognizer: Recognizer,
        options: DispatchOptions,
    ) -> Self {
        Self {
            store,
            runner,
            recognizer,
            options,
        }
    }

    /// Handle one event and always produce a reply, errors included.
    pub async fn handle(&self, event: &InboundEvent, resolver: &dyn AttachmentResolver) -> String {
        match self.dispatch(event, resolver).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::info!(
                    "Command in conversation {} failed: {}",
                    event.conversation_id,
                    e
                );
                e.to_string()
            }
        }
    }

    /// Classify and execute one event.
    ///
    /// A CLI that runs but fails is still an `Ok` reply carrying its output.
    pub async fn dispatch(
        &self,
        event: &InboundEvent,
        resolver: &dyn AttachmentResolver,
    ) -> Result<String> {
        let intent = self.recognizer.classify(&event.conversation_id, &event.text);
        tracing::debug!(
            "Classified message in {} as {:?}",
            intent.conversation_id,
            intent.kind
        );

        match intent.kind {
            IntentKind::Upload => self.upload(event, resolver).await,
            IntentKind::Exec => self.exec(&intent).await,
            IntentKind::Invalid => Err(Error::InvalidCommand),
        }
    }

    async fn upload(&self, event: &InboundEvent, resolver: &dyn AttachmentResolver) -> Result<String> {
        let content = resolver
            .resolve(event)
            .await?
            .filter(|bytes| !bytes.is_empty())
            .ok_or(Error::NoAttachment)?;

        if self.options.validate_credentials {
            kubeconfig::validate(&content)?;
        }

        self.store.put(&event.conversation_id, &content).await?;
        Ok(UPLOAD_OK.to_string())
    }

    async fn exec(&self, intent: &CommandIntent) -> Result<String> {
        let path = self.store.get(&intent.conversation_id).await?;

        let mut args = intent.argv.clone();
        args.push(format!("--kubeconfig={}", path.display()));

        match self.runner.run(&self.options.cli_path, &args).await {
            Ok(out) => Ok(reply::fenced(&out.output)),
            Err(Error::CommandFailed { status, output }) => {
                Ok(reply::failure(&status.to_string(), &output))
            }
            Err(e @ Error::ProcessInvocation(_)) => {
                tracing::warn!("Could not run {}: {}", self.options.cli_path, e);
                Ok(reply::failure(&e.to_string(), ""))
            }
            Err(e) => Err(e),
        }
    }
}
