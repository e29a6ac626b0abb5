//! Session event types

use chatline_stream::ConversationUpdate;
use serde::{Deserialize, Serialize};

use crate::theme::Theme;

/// Events emitted while a session runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// User turn and bot placeholder are in place; the request is going out
    ExchangeStart { placeholder_index: usize },

    /// A streamed event changed a turn
    Update { update: ConversationUpdate },

    /// The reply stream ended normally
    ExchangeEnd { index: usize },

    /// The exchange failed; `index` is the apology turn
    Error { index: usize, message: String },

    /// Conversation was reset to the greeting
    Cleared,

    /// Theme preference changed
    ThemeChanged { theme: Theme },
}

impl SessionEvent {
    /// Check if this event ends an exchange
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::ExchangeEnd { .. } | SessionEvent::Error { .. }
        )
    }
}
