//! Conversation and wire types

use serde::{Deserialize, Serialize};

/// Auxiliary structured data attached to a bot turn.
///
/// Values are scalars or sequences of scalars in practice, but the payload is
/// kept as raw JSON so nothing the service sends is lost.
pub type ContextPayload = serde_json::Map<String, serde_json::Value>;

/// Author of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    /// Wire name of this sender
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub text: String,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextPayload>,
}

impl Turn {
    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            context: None,
        }
    }

    /// Create a bot turn
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
            context: None,
        }
    }

    /// Empty bot turn filled in as a reply streams
    pub fn placeholder() -> Self {
        Self::bot(String::new())
    }

    /// Whether nothing has been streamed into this turn yet
    pub fn is_blank(&self) -> bool {
        self.text.is_empty() && self.context.is_none()
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }

    /// Wire form of this turn (context stripped)
    pub fn to_history(&self) -> HistoryEntry {
        HistoryEntry {
            text: self.text.clone(),
            sender: self.sender,
        }
    }
}

/// A turn as sent in the request history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub text: String,
    pub sender: Sender,
}

/// An attached file as sent to the endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Request body for one exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub content: String,
    #[serde(default)]
    pub files: Vec<FileAttachment>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl ChatRequest {
    /// Build a request from user text and the turns preceding it
    pub fn new(content: impl Into<String>, history: &[Turn]) -> Self {
        Self {
            content: content.into(),
            files: Vec::new(),
            history: history.iter().map(Turn::to_history).collect(),
        }
    }

    /// Attach files to the request
    pub fn with_files(mut self, files: Vec<FileAttachment>) -> Self {
        self.files = files;
        self
    }
}
