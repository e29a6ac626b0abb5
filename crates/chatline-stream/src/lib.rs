//! chatline-stream: streaming reply assembly for chat endpoints
//!
//! This crate turns the Server-Sent-Event body of a chat endpoint into ordered
//! updates for one conversation turn, and provides the HTTP client that opens
//! those bodies.

pub mod client;
pub mod decode;
pub mod error;
pub mod stream;
pub mod types;

pub use client::{ByteStream, ChatClient};
pub use error::{Error, Result};
pub use stream::{ConversationUpdate, ConversationUpdateStream, ReplyAssembler, consume};
pub use types::*;
