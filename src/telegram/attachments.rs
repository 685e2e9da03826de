//! Credential attachment resolution for Telegram messages.
//!
//! Telegram has no "list files in chat" call, so the bot remembers the last
//! document each user shared in each chat as messages stream past.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::dispatch::{AttachmentRef, AttachmentResolver, InboundEvent};
use crate::error::{Error, Result};

/// Last document per (chat, user).
#[derive(Debug, Default)]
pub struct RecentAttachments {
    entries: Mutex<HashMap<(String, String), AttachmentRef>>,
}

impl RecentAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn remember(&self, conversation_id: &str, user_id: &str, file: AttachmentRef) {
        let mut entries = self.entries.lock().await;
        entries.insert((conversation_id.to_string(), user_id.to_string()), file);
    }

    pub async fn latest(&self, conversation_id: &str, user_id: &str) -> Option<AttachmentRef> {
        let entries = self.entries.lock().await;
        entries
            .get(&(conversation_id.to_string(), user_id.to_string()))
            .cloned()
    }
}

/// Fetches file contents by platform handle.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self, file: &AttachmentRef) -> Result<Vec<u8>>;
}

/// Downloads files through the Bot API `getFile` endpoint.
pub struct BotApiFetcher {
    token: String,
    max_bytes: u64,
    client: reqwest::Client,
}

impl BotApiFetcher {
    pub fn new(token: impl Into<String>, max_bytes: u64) -> Self {
        Self {
            token: token.into(),
            max_bytes,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl FileFetcher for BotApiFetcher {
    async fn fetch(&self, file: &AttachmentRef) -> Result<Vec<u8>> {
        let get_file_url = format!(
            "https://api.telegram.org/bot{}/getFile?file_id={}",
            self.token, file.0
        );
        let value: serde_json::Value = self
            .client
            .get(get_file_url)
            .send()
            .await
            .map_err(|e| Error::Download(e.without_url().to_string()))?
            .json()
            .await
            .map_err(|e| Error::Download(e.without_url().to_string()))?;

        let result = value
            .get("result")
            .ok_or_else(|| Error::Download("Telegram getFile returned no result".to_string()))?;
        if let Some(size) = result.get("file_size").and_then(|s| s.as_u64()) {
            if size > self.max_bytes {
                tracing::info!("Attachment of {} bytes exceeds limit {}", size, self.max_bytes);
                return Err(Error::NoAttachment);
            }
        }
        let file_path = result
            .get("file_path")
            .and_then(|p| p.as_str())
            .ok_or_else(|| Error::Download("Telegram getFile returned no file_path".to_string()))?;

        let download_url = format!("https://api.telegram.org/file/bot{}/{}", self.token, file_path);
        let bytes = self
            .client
            .get(download_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Download(e.without_url().to_string()))?
            .bytes()
            .await
            .map_err(|e| Error::Download(e.without_url().to_string()))?;

        if bytes.len() as u64 > self.max_bytes {
            return Err(Error::NoAttachment);
        }

        Ok(bytes.to_vec())
    }
}

/// Resolution order: the event's own attachment (the adapter fills this from
/// the message or the message it replies to), then the sender's most recent
/// document in the same chat.
pub struct TelegramResolver<F> {
    fetcher: F,
    recent: std::sync::Arc<RecentAttachments>,
}

impl<F: FileFetcher> TelegramResolver<F> {
    pub fn new(fetcher: F, recent: std::sync::Arc<RecentAttachments>) -> Self {
        Self { fetcher, recent }
    }
}

#[async_trait]
impl<F: FileFetcher> AttachmentResolver for TelegramResolver<F> {
    async fn resolve(&self, event: &InboundEvent) -> Result<Option<Vec<u8>>> {
        let file = match &event.attachment {
            Some(file) => Some(file.clone()),
            None => match event.user_id.as_deref() {
                Some(user) => self.recent.latest(&event.conversation_id, user).await,
                None => None,
            },
        };

        let Some(file) = file else {
            return Ok(None);
        };

        tracing::debug!("Resolving attachment {} for {}", file.0, event.conversation_id);
        self.fetcher.fetch(&file).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct EchoFetcher;

    #[async_trait]
    impl FileFetcher for EchoFetcher {
        async fn fetch(&self, file: &AttachmentRef) -> Result<Vec<u8>> {
            Ok(file.0.as_bytes().to_vec())
        }
    }

    fn event(attachment: Option<&str>, user: Option<&str>) -> InboundEvent {
        InboundEvent {
            conversation_id: "-100".to_string(),
            text: "@bot upload".to_string(),
            user_id: user.map(ToString::to_string),
            attachment: attachment.map(|a| AttachmentRef(a.to_string())),
            thread_marker: None,
        }
    }

    #[tokio::test]
    async fn own_attachment_wins() {
        let recent = Arc::new(RecentAttachments::new());
        recent
            .remember("-100", "7", AttachmentRef("older".to_string()))
            .await;
        let resolver = TelegramResolver::new(EchoFetcher, recent);

        let bytes = resolver.resolve(&event(Some("fresh"), Some("7"))).await.unwrap();
        assert_eq!(bytes, Some(b"fresh".to_vec()));
    }

    #[tokio::test]
    async fn falls_back_to_latest_document_from_sender() {
        let recent = Arc::new(RecentAttachments::new());
        recent.remember("-100", "7", AttachmentRef("first".to_string())).await;
        recent.remember("-100", "7", AttachmentRef("second".to_string())).await;
        recent.remember("-100", "8", AttachmentRef("someone-else".to_string())).await;
        let resolver = TelegramResolver::new(EchoFetcher, recent);

        let bytes = resolver.resolve(&event(None, Some("7"))).await.unwrap();
        assert_eq!(bytes, Some(b"second".to_vec()));
    }

    #[tokio::test]
    async fn nothing_to_resolve() {
        let recent = Arc::new(RecentAttachments::new());
        recent.remember("-200", "7", AttachmentRef("other-chat".to_string())).await;
        let resolver = TelegramResolver::new(EchoFetcher, recent);

        assert_eq!(resolver.resolve(&event(None, Some("7"))).await.unwrap(), None);
        assert_eq!(resolver.resolve(&event(None, None)).await.unwrap(), None);
    }
}
