//! Server-Sent-Event reply assembly
//!
//! The chat endpoint answers with `data: <json>` lines. Each line is either a
//! text fragment (`{"content": "..."}`) or a context payload
//! (`{"type": "context", "data": {...}}`). [`ReplyAssembler`] folds those into
//! the cumulative state of one bot turn and reports a [`ConversationUpdate`]
//! per recognized event.

use std::pin::Pin;

use async_stream::stream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio_stream::Stream;

use crate::decode::{LineBuffer, Utf8Decoder};
use crate::error::Result;
use crate::types::{ContextPayload, Turn};

/// Prefix marking an event line
pub const DATA_PREFIX: &str = "data: ";

/// A recognized event from the response body
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A text fragment to append
    Content(String),
    /// Replacement context payload for the turn
    Context(ContextPayload),
}

/// Why a `data: ` line was rejected
#[derive(Debug, Error)]
pub enum MalformedEvent {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("context event without an object `data` field")]
    ContextShape,

    #[error("content event without a string `content` field")]
    ContentShape,
}

/// Parse one line of the body.
///
/// Returns `None` for lines that are not events at all (blank lines, comments,
/// other SSE fields).
pub fn parse_data_line(line: &str) -> Option<std::result::Result<StreamEvent, MalformedEvent>> {
    let payload = line.strip_prefix(DATA_PREFIX)?;
    Some(parse_payload(payload))
}

fn parse_payload(payload: &str) -> std::result::Result<StreamEvent, MalformedEvent> {
    let Value::Object(mut fields) = serde_json::from_str::<Value>(payload)? else {
        return Err(MalformedEvent::NotAnObject);
    };

    if fields.get("type").and_then(Value::as_str) == Some("context") {
        match fields.remove("data") {
            Some(Value::Object(data)) => Ok(StreamEvent::Context(data)),
            _ => Err(MalformedEvent::ContextShape),
        }
    } else {
        match fields.remove("content") {
            Some(Value::String(fragment)) => Ok(StreamEvent::Content(fragment)),
            _ => Err(MalformedEvent::ContentShape),
        }
    }
}

/// A state change for one turn, produced by one recognized event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationUpdate {
    /// The turn's full text so far
    Text { index: usize, text: String },
    /// The turn's context, replacing any earlier one
    Context { index: usize, context: ContextPayload },
}

impl ConversationUpdate {
    /// Index of the turn this update targets
    pub fn index(&self) -> usize {
        match self {
            ConversationUpdate::Text { index, .. } | ConversationUpdate::Context { index, .. } => {
                *index
            }
        }
    }

    /// Write this update into `turns`. Returns `false` if the index is gone.
    pub fn apply(&self, turns: &mut [Turn]) -> bool {
        let Some(turn) = turns.get_mut(self.index()) else {
            return false;
        };
        match self {
            ConversationUpdate::Text { text, .. } => turn.text.clone_from(text),
            ConversationUpdate::Context { context, .. } => turn.context = Some(context.clone()),
        }
        true
    }
}

/// Accumulates one streamed reply
#[derive(Debug)]
pub struct ReplyAssembler {
    target_index: usize,
    decoder: Utf8Decoder,
    lines: LineBuffer,
    text: String,
    context: Option<ContextPayload>,
    malformed: usize,
}

impl ReplyAssembler {
    /// Create an assembler filling the turn at `target_index`
    pub fn new(target_index: usize) -> Self {
        Self {
            target_index,
            decoder: Utf8Decoder::new(),
            lines: LineBuffer::new(),
            text: String::new(),
            context: None,
            malformed: 0,
        }
    }

    /// Feed one body chunk, returning the updates for every line it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ConversationUpdate> {
        let decoded = self.decoder.decode(chunk);
        let lines = self.lines.push(&decoded);
        lines
            .iter()
            .filter_map(|line| self.process_line(line))
            .collect()
    }

    /// Flush held-back bytes and the unterminated last line at end of body
    pub fn finish(&mut self) -> Vec<ConversationUpdate> {
        let tail = self.decoder.finish();
        let mut lines = self.lines.push(&tail);
        lines.extend(self.lines.finish());
        lines
            .iter()
            .filter_map(|line| self.process_line(line))
            .collect()
    }

    fn process_line(&mut self, line: &str) -> Option<ConversationUpdate> {
        match parse_data_line(line)? {
            Ok(StreamEvent::Content(fragment)) => {
                self.text.push_str(&fragment);
                Some(ConversationUpdate::Text {
                    index: self.target_index,
                    text: self.text.clone(),
                })
            }
            Ok(StreamEvent::Context(context)) => {
                self.context = Some(context.clone());
                Some(ConversationUpdate::Context {
                    index: self.target_index,
                    context,
                })
            }
            Err(e) => {
                self.malformed += 1;
                tracing::warn!(
                    "Skipping malformed stream event for turn {}: {}",
                    self.target_index,
                    e
                );
                None
            }
        }
    }

    /// Text accumulated so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Last context payload seen
    pub fn context(&self) -> Option<&ContextPayload> {
        self.context.as_ref()
    }

    /// Number of `data: ` lines that were rejected
    pub fn malformed_lines(&self) -> usize {
        self.malformed
    }

    /// The assembled bot turn
    pub fn into_turn(self) -> Turn {
        Turn {
            text: self.text,
            sender: crate::types::Sender::Bot,
            context: self.context,
        }
    }
}

/// A stream of conversation updates
pub type ConversationUpdateStream = Pin<Box<dyn Stream<Item = Result<ConversationUpdate>> + Send>>;

/// Consume a response body, yielding one update per recognized event.
///
/// The stream ends when the body ends. A body error is yielded once and ends
/// the stream.
pub fn consume<S, B>(body: S, target_index: usize) -> ConversationUpdateStream
where
    S: Stream<Item = Result<B>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    Box::pin(stream! {
        let mut body = Box::pin(body);
        let mut assembler = ReplyAssembler::new(target_index);

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for update in assembler.feed(bytes.as_ref()) {
                        yield Ok(update);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        for update in assembler.finish() {
            yield Ok(update);
        }
    })
}
