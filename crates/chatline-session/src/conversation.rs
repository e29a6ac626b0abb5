//! Conversation state: the ordered turn sequence and its edit rules.

use chatline_stream::{ChatRequest, ConversationUpdate, FileAttachment, HistoryEntry, Turn};

use crate::error::{Error, Result};

/// Greeting shown in a fresh conversation
pub const DEFAULT_GREETING: &str = "Hello! How can I help you today?";

/// Ordered turns of one conversation
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

/// An exchange that has been staged in the conversation but not yet sent
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedExchange {
    /// Text of the user turn
    pub content: String,
    /// History to send alongside it
    pub history: Vec<HistoryEntry>,
    /// Index of the bot placeholder the reply streams into
    pub placeholder_index: usize,
}

impl PreparedExchange {
    /// Build the wire request
    pub fn into_request(self, files: Vec<FileAttachment>) -> ChatRequest {
        ChatRequest {
            content: self.content,
            files,
            history: self.history,
        }
    }
}

impl Conversation {
    /// Fresh conversation holding only the greeting
    pub fn new(greeting: &str) -> Self {
        Self {
            turns: vec![Turn::bot(greeting)],
        }
    }

    /// Restore a conversation from saved turns
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Turn> {
        self.turns.get(index)
    }

    /// Whether the user has not said anything yet
    pub fn is_fresh(&self) -> bool {
        !self.turns.iter().any(Turn::is_user)
    }

    /// The whole conversation in wire form
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.turns.iter().map(Turn::to_history).collect()
    }

    /// Stage a new user message and its reply placeholder.
    ///
    /// History holds every turn before the new message; the message itself
    /// travels as the request content.
    pub fn begin_send(&mut self, content: &str) -> PreparedExchange {
        let history = self.history();
        self.turns.push(Turn::user(content));
        self.push_placeholder(content, history)
    }

    /// Replace the user turn at `index`, discarding everything after it, and
    /// stage a reply placeholder.
    ///
    /// History holds turns `0..index` followed by the edited turn.
    pub fn begin_edit(&mut self, index: usize, content: &str) -> Result<PreparedExchange> {
        self.check_editable(index)?;

        self.turns.truncate(index);
        self.turns.push(Turn::user(content));
        let history = self.history();
        Ok(self.push_placeholder(content, history))
    }

    /// Validate an edit target without changing anything
    pub fn check_editable(&self, index: usize) -> Result<()> {
        match self.turns.get(index) {
            None => Err(Error::TurnOutOfRange {
                index,
                len: self.turns.len(),
            }),
            Some(turn) if !turn.is_user() => Err(Error::NotAUserTurn { index }),
            Some(_) => Ok(()),
        }
    }

    fn push_placeholder(&mut self, content: &str, history: Vec<HistoryEntry>) -> PreparedExchange {
        self.turns.push(Turn::placeholder());
        PreparedExchange {
            content: content.to_string(),
            history,
            placeholder_index: self.turns.len() - 1,
        }
    }

    /// Apply a streamed update. Returns `false` if its turn no longer exists.
    pub fn apply(&mut self, update: &ConversationUpdate) -> bool {
        update.apply(&mut self.turns)
    }

    /// Record a failed exchange.
    ///
    /// A placeholder that never received anything is replaced by the apology;
    /// one holding partial output is kept and the apology follows it.
    pub fn fail_exchange(&mut self, placeholder_index: usize, apology: &str) -> usize {
        let is_untouched_tail = placeholder_index + 1 == self.turns.len()
            && self.turns[placeholder_index].is_bot()
            && self.turns[placeholder_index].is_blank();

        if is_untouched_tail {
            self.turns[placeholder_index] = Turn::bot(apology);
            placeholder_index
        } else {
            self.turns.push(Turn::bot(apology));
            self.turns.len() - 1
        }
    }

    /// Start over with only the greeting
    pub fn reset(&mut self, greeting: &str) {
        self.turns = vec![Turn::bot(greeting)];
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_GREETING)
    }
}
