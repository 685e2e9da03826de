//! File-backed credential store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::CredentialStore;
use crate::config::{RetentionPolicy, StoreConfig};
use crate::error::{Error, Result};

/// Credential files live in a scratch directory; the in-memory map is the
/// only record of which file belongs to which conversation. Nothing survives
/// a restart.
pub struct FileCredentialStore {
    scratch_dir: PathBuf,
    retention: RetentionPolicy,
    entries: RwLock<HashMap<String, PathBuf>>,
}

impl FileCredentialStore {
    /// Create a store writing into `scratch_dir`, creating the directory if needed.
    pub fn new(scratch_dir: impl AsRef<Path>, retention: RetentionPolicy) -> Result<Self> {
        let scratch_dir = scratch_dir.as_ref();
        std::fs::create_dir_all(scratch_dir)?;
        // Mapped paths must be absolute so they stay valid for any child cwd.
        let scratch_dir = std::fs::canonicalize(scratch_dir)?;

        tracing::debug!(
            "Credential store using {} (retention: {:?})",
            scratch_dir.display(),
            retention
        );

        Ok(Self {
            scratch_dir,
            retention,
            entries: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::new(config.scratch_dir(), config.retention)
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Number of conversations with a registered credential.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn swap_entry(&self, conversation_id: &str, path: PathBuf) -> Option<PathBuf> {
        // A single insert cannot leave the map half-updated, so a poisoned
        // lock still guards consistent data.
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(conversation_id.to_string(), path)
    }

    fn release_superseded(&self, previous: &Path) {
        match self.retention {
            RetentionPolicy::Retain => {
                tracing::debug!("Retaining superseded credential {}", previous.display());
            }
            RetentionPolicy::RemoveSuperseded => {
                if let Err(e) = std::fs::remove_file(previous) {
                    tracing::warn!(
                        "Failed to remove superseded credential {}: {}",
                        previous.display(),
                        e
                    );
                } else {
                    tracing::debug!("Removed superseded credential {}", previous.display());
                }
            }
        }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn put(&self, conversation_id: &str, content: &[u8]) -> Result<PathBuf> {
        let dir = self.scratch_dir.clone();
        let prefix = format!("config-{}-", sanitize_conversation_id(conversation_id));
        let content = content.to_vec();

        // The write happens outside the map lock; only the swap is serialized.
        let path = tokio::task::spawn_blocking(move || write_credential_file(&dir, &prefix, &content))
            .await
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        let previous = self.swap_entry(conversation_id, path.clone());

        tracing::info!("Stored credential for conversation {}", conversation_id);
        tracing::debug!("Credential path for {}: {}", conversation_id, path.display());

        if let Some(previous) = previous.filter(|p| *p != path) {
            self.release_superseded(&previous);
        }

        Ok(path)
    }

    async fn get(&self, conversation_id: &str) -> Result<PathBuf> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        entries.get(conversation_id).cloned().ok_or(Error::NotFound)
    }
}

/// Create a uniquely named 0600 file in `dir` holding `content` and keep it on disk.
///
/// On any failure the temp file is dropped, which removes it.
fn write_credential_file(dir: &Path, prefix: &str, content: &[u8]) -> std::io::Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .rand_bytes(16)
        .tempfile_in(dir)?;

    file.write_all(content)?;
    file.flush()?;
    file.as_file().sync_all()?;

    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

/// Make a conversation ID safe to embed in a file name.
fn sanitize_conversation_id(id: &str) -> String {
    let out: String = id
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '_'
            }
        })
        .collect();

    if out.is_empty() {
        "conversation".to_string()
    } else {
        out
    }
}
