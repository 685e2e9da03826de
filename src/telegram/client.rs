//! Telegram bot client - simple polling version.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::RequestError;

use crate::config::Settings;
use crate::dispatch::{AttachmentRef, DispatchOptions, Dispatcher, InboundEvent, Recognizer};
use crate::error::Error;
use crate::runner::ProcessRunner;
use crate::store::FileCredentialStore;

use super::attachments::{BotApiFetcher, RecentAttachments, TelegramResolver};
use super::render::render_html;

struct BotState {
    recognizer: Recognizer,
    dispatcher: Dispatcher,
    resolver: TelegramResolver<BotApiFetcher>,
    recent: Arc<RecentAttachments>,
}

/// Run the Telegram bot until interrupted.
pub async fn run_bot(settings: Settings) -> Result<(), Error> {
    tracing::info!("Starting Telegram bot...");

    let token = settings
        .telegram
        .bot_token
        .clone()
        .ok_or_else(|| Error::Telegram("No bot token configured".to_string()))?;

    let bot = Bot::new(token.clone());

    let me = bot
        .get_me()
        .await
        .map_err(|e| Error::Telegram(format!("getMe failed: {}", e)))?;
    let username = me
        .user
        .username
        .clone()
        .ok_or_else(|| Error::Telegram("Bot account has no username".to_string()))?;
    let recognizer = Recognizer::for_username(&username)?;

    let store = Arc::new(FileCredentialStore::from_config(&settings.store)?);
    let runner = Arc::new(ProcessRunner::with_timeout(settings.exec.timeout()));
    tracing::info!(
        "Credential files go to {}, CLI is '{}'",
        store.scratch_dir().display(),
        settings.exec.cli_path
    );

    let recent = Arc::new(RecentAttachments::new());
    let state = Arc::new(BotState {
        dispatcher: Dispatcher::new(
            store,
            runner,
            recognizer.clone(),
            DispatchOptions::from(&settings.exec),
        ),
        resolver: TelegramResolver::new(
            BotApiFetcher::new(token, settings.telegram.max_attachment_bytes),
            Arc::clone(&recent),
        ),
        recognizer,
        recent,
    });

    tracing::info!("Listening for mentions of @{}", username);

    teloxide::repl(bot, move |bot: Bot, msg: Message| {
        let state = Arc::clone(&state);
        async move { handle_message(bot, msg, &state).await }
    })
    .await;

    Ok(())
}

/// The parts of a Telegram message the bot cares about.
#[derive(Debug, Clone, Default)]
struct MessageParts {
    chat_id: i64,
    user_id: Option<u64>,
    text: String,
    document: Option<String>,
    replied_document: Option<String>,
    thread_id: Option<i32>,
}

impl MessageParts {
    fn from_message(msg: &Message) -> Self {
        Self {
            chat_id: msg.chat.id.0,
            user_id: msg.from.as_ref().map(|u| u.id.0),
            text: msg
                .text()
                .or_else(|| msg.caption())
                .unwrap_or("")
                .to_string(),
            document: msg.document().map(|doc| doc.file.id.to_string()),
            replied_document: msg
                .reply_to_message()
                .and_then(|m| m.document())
                .map(|doc| doc.file.id.to_string()),
            thread_id: msg.thread_id.map(|t| t.0 .0),
        }
    }

    fn conversation_id(&self) -> String {
        self.chat_id.to_string()
    }

    /// The message's own document wins over the one it replies to.
    fn into_event(self) -> InboundEvent {
        InboundEvent {
            conversation_id: self.conversation_id(),
            user_id: self.user_id.map(|id| id.to_string()),
            attachment: self.document.or(self.replied_document).map(AttachmentRef),
            thread_marker: self.thread_id.map(|id| id.to_string()),
            text: self.text,
        }
    }
}

/// Handle incoming messages.
async fn handle_message(bot: Bot, msg: Message, state: &BotState) -> Result<(), RequestError> {
    let parts = MessageParts::from_message(&msg);

    // Every shared document is a candidate for a later bare "upload".
    if let (Some(doc), Some(user)) = (&parts.document, parts.user_id) {
        state
            .recent
            .remember(&parts.conversation_id(), &user.to_string(), AttachmentRef(doc.clone()))
            .await;
    }

    if !state.recognizer.is_addressed(&parts.text) {
        return Ok(());
    }

    let event = parts.into_event();
    let reply = state.dispatcher.handle(&event, &state.resolver).await;

    let mut request = bot
        .send_message(msg.chat.id, render_html(&reply))
        .parse_mode(ParseMode::Html);
    if let Some(thread) = msg.thread_id {
        request = request.message_thread_id(thread);
    }
    if let Err(e) = request.await {
        tracing::warn!("Failed to send reply to {}: {}", event.conversation_id, e);
    }

    Ok(())
}
