//! Channel-scoped credential store.
//!
//! Maps a conversation ID to the on-disk kubeconfig uploaded into that
//! conversation. Callers only see the [`CredentialStore`] contract; the
//! file-backed implementation lives in [`file`].

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::Result;

pub mod file;

pub use file::FileCredentialStore;

/// Registry of one credential file per conversation.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Write `content` to a fresh private file and map `conversation_id` to it,
    /// replacing any previous mapping. Returns the new path.
    async fn put(&self, conversation_id: &str, content: &[u8]) -> Result<PathBuf>;

    /// Path currently mapped to `conversation_id`. Fails with
    /// [`Error::NotFound`](crate::error::Error::NotFound) when nothing was uploaded.
    async fn get(&self, conversation_id: &str) -> Result<PathBuf>;
}
