//! chatline-session: conversation state and send/edit orchestration
//!
//! This crate owns one chat conversation: it stages user turns, streams
//! replies into them through a [`Transport`], persists the result through a
//! [`ConversationStore`], and broadcasts [`SessionEvent`]s for front ends.

pub mod attachments;
pub mod conversation;
pub mod error;
pub mod events;
pub mod feedback;
pub mod handle;
pub mod session;
pub mod store;
pub mod suggestions;
pub mod theme;
pub mod transport;

pub use attachments::{AttachError, AttachReport, Attachment, AttachmentSet, DEFAULT_MAX_FILE_SIZE};
pub use conversation::{Conversation, DEFAULT_GREETING, PreparedExchange};
pub use error::{Error, Result};
pub use events::SessionEvent;
pub use feedback::{Feedback, FeedbackLog};
pub use handle::SessionHandle;
pub use session::{ChatSession, DEFAULT_APOLOGY, ExchangeOutcome, Features, SessionConfig};
pub use store::{ConversationStore, JsonFileStore, MemoryStore, Snapshot};
pub use suggestions::{SuggestionCard, default_cards};
pub use theme::Theme;
pub use transport::{HttpTransport, Transport};
