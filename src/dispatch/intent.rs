//! Command classification.

use regex::Regex;

use crate::error::{Error, Result};

/// What an inbound message asks the bot to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentKind {
    Upload,
    Exec,
    Invalid,
}

/// Parsed view of one inbound message. Produced per message, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandIntent {
    pub kind: IntentKind,
    pub conversation_id: String,
    pub raw_text: String,
    /// CLI arguments for [`IntentKind::Exec`]; empty otherwise.
    pub argv: Vec<String>,
}

/// Compiled recognizers for the upload and exec command shapes.
///
/// Every pattern is anchored at the start of the text on the mention and
/// matches case-sensitively.
#[derive(Debug, Clone)]
pub struct Recognizer {
    mention: Regex,
    upload: Regex,
    exec: Regex,
}

impl Recognizer {
    /// Build recognizers around a platform mention pattern (a regex fragment).
    pub fn new(mention_pattern: &str) -> Result<Self> {
        let mention = Regex::new(&format!(r"^(?:{})", mention_pattern))
            .map_err(|e| Error::Config(format!("invalid mention pattern: {}", e)))?;
        let upload = Regex::new(&format!(r"^(?:{})\s*upload\b", mention_pattern))
            .map_err(|e| Error::Config(format!("invalid mention pattern: {}", e)))?;
        let exec = Regex::new(&format!(r"^(?:{})\s*(?:kubectl|oc)(?:\s+|$)", mention_pattern))
            .map_err(|e| Error::Config(format!("invalid mention pattern: {}", e)))?;

        Ok(Self {
            mention,
            upload,
            exec,
        })
    }

    /// Recognizer for a Telegram bot addressed as `@username`.
    pub fn for_username(username: &str) -> Result<Self> {
        let username = username.trim_start_matches('@');
        if username.is_empty() {
            return Err(Error::Config("bot username is empty".to_string()));
        }
        Self::new(&format!("@{}", regex::escape(username)))
    }

    /// Whether `text` opens with the bot mention at all.
    pub fn is_addressed(&self, text: &str) -> bool {
        self.mention.is_match(text)
    }

    /// Classify `text`. Upload is tested before exec; anything else is invalid.
    pub fn classify(&self, conversation_id: &str, text: &str) -> CommandIntent {
        let (kind, argv) = if self.upload.is_match(text) {
            (IntentKind::Upload, Vec::new())
        } else if let Some(m) = self.exec.find(text) {
            (IntentKind::Exec, split_args(&text[m.end()..]))
        } else {
            (IntentKind::Invalid, Vec::new())
        };

        CommandIntent {
            kind,
            conversation_id: conversation_id.to_string(),
            raw_text: text.to_string(),
            argv,
        }
    }
}

/// Naive whitespace split; quotes get no special treatment.
fn split_args(rest: &str) -> Vec<String> {
    rest.split_whitespace().map(ToString::to_string).collect()
}
