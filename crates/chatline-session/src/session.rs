//! The chat session: conversation state plus send/edit orchestration

use std::path::Path;
use std::sync::Arc;

use chatline_stream::{ChatRequest, ContextPayload, FileAttachment, Turn, consume};
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::attachments::{
    AttachError, AttachReport, Attachment, AttachmentSet, DEFAULT_MAX_FILE_SIZE,
};
use crate::conversation::{Conversation, DEFAULT_GREETING, PreparedExchange};
use crate::error::{Error, Result};
use crate::events::SessionEvent;
use crate::feedback::{Feedback, FeedbackLog};
use crate::handle::{BusyGuard, SessionHandle};
use crate::store::{ConversationStore, Snapshot};
use crate::suggestions::{SuggestionCard, default_cards};
use crate::theme::Theme;
use crate::transport::Transport;

/// Turn text used when an exchange fails
pub const DEFAULT_APOLOGY: &str = "Sorry, there was an error processing your request.";

/// Optional behaviors that can be switched off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Features {
    pub file_upload: bool,
    /// Load and save the conversation through the store
    pub chat_history: bool,
    pub message_editing: bool,
    pub theme_switching: bool,
    pub show_context: bool,
    pub show_suggestion_cards: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            file_upload: true,
            chat_history: true,
            message_editing: true,
            theme_switching: true,
            show_context: true,
            show_suggestion_cards: true,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// First bot turn of a fresh conversation
    pub greeting: String,
    /// Bot turn appended when an exchange fails
    pub apology: String,
    pub features: Features,
    pub suggestions: Vec<SuggestionCard>,
    /// Per-file attachment limit in bytes
    pub max_file_size: u64,
    /// Theme used when no snapshot says otherwise
    pub theme: Theme,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            apology: DEFAULT_APOLOGY.to_string(),
            features: Features::default(),
            suggestions: default_cards(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            theme: Theme::default(),
        }
    }
}

/// How an accepted send or edit ended
#[derive(Debug)]
pub enum ExchangeOutcome {
    /// The reply streamed into the turn at `index`
    Completed { index: usize },
    /// The exchange failed; `index` is the apology turn
    Failed {
        index: usize,
        error: chatline_stream::Error,
    },
}

impl ExchangeOutcome {
    pub fn index(&self) -> usize {
        match self {
            ExchangeOutcome::Completed { index } | ExchangeOutcome::Failed { index, .. } => *index,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, ExchangeOutcome::Completed { .. })
    }
}

struct State {
    conversation: Conversation,
    attachments: AttachmentSet,
    feedback: FeedbackLog,
    theme: Theme,
}

/// One chat conversation bound to a transport and a store
pub struct ChatSession {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn ConversationStore>,
    state: Mutex<State>,
    event_tx: broadcast::Sender<SessionEvent>,
    handle: SessionHandle,
}

impl ChatSession {
    /// Create a session, restoring the last snapshot from `store` if there is
    /// one. With `chat_history` off the store is never touched.
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        let snapshot = if config.features.chat_history {
            match store.load() {
                Ok(snapshot) => snapshot.filter(|s| !s.turns.is_empty()),
                Err(e) => {
                    tracing::warn!("Could not restore conversation, starting fresh: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let state = match snapshot {
            Some(snapshot) => {
                tracing::debug!("Restored {} turns", snapshot.turns.len());
                State {
                    conversation: Conversation::from_turns(snapshot.turns),
                    attachments: AttachmentSet::new(config.max_file_size),
                    feedback: snapshot.feedback,
                    theme: snapshot.theme,
                }
            }
            None => State {
                conversation: Conversation::new(&config.greeting),
                attachments: AttachmentSet::new(config.max_file_size),
                feedback: FeedbackLog::new(),
                theme: config.theme,
            },
        };

        let (event_tx, _) = broadcast::channel(256);

        Self {
            config,
            transport,
            store,
            state: Mutex::new(state),
            event_tx,
            handle: SessionHandle::new(),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle onto the busy state
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.handle.is_busy()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Copy of the current turns
    pub fn turns(&self) -> Vec<Turn> {
        self.state.lock().conversation.turns().to_vec()
    }

    pub fn turn(&self, index: usize) -> Option<Turn> {
        self.state.lock().conversation.get(index).cloned()
    }

    pub fn feedback(&self) -> FeedbackLog {
        self.state.lock().feedback.clone()
    }

    pub fn theme(&self) -> Theme {
        self.state.lock().theme
    }

    /// Names of the staged attachments, in order
    pub fn attachments(&self) -> Vec<String> {
        self.state.lock().attachments.names()
    }

    /// Send a new user message and stream the reply
    pub async fn send(&self, content: &str) -> Result<ExchangeOutcome> {
        if content.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }
        let guard = self.handle.try_begin().ok_or(Error::Busy)?;

        let (exchange, files) = {
            let mut state = self.state.lock();
            let exchange = state.conversation.begin_send(content);
            (exchange, self.outgoing_files(&state))
        };

        Ok(self.run_exchange(exchange, files, guard).await)
    }

    /// Replace the user turn at `index`, drop everything after it, and
    /// stream a fresh reply
    pub async fn edit(&self, index: usize, content: &str) -> Result<ExchangeOutcome> {
        if !self.config.features.message_editing {
            return Err(Error::FeatureDisabled("message editing"));
        }
        if content.trim().is_empty() {
            return Err(Error::EmptyMessage);
        }
        let guard = self.handle.try_begin().ok_or(Error::Busy)?;

        let (exchange, files) = {
            let mut state = self.state.lock();
            let exchange = state.conversation.begin_edit(index, content)?;
            state.feedback.truncate(index);
            (exchange, self.outgoing_files(&state))
        };

        Ok(self.run_exchange(exchange, files, guard).await)
    }

    fn outgoing_files(&self, state: &State) -> Vec<FileAttachment> {
        if self.config.features.file_upload {
            state.attachments.to_wire()
        } else {
            Vec::new()
        }
    }

    async fn run_exchange(
        &self,
        exchange: PreparedExchange,
        files: Vec<FileAttachment>,
        guard: BusyGuard,
    ) -> ExchangeOutcome {
        let placeholder_index = exchange.placeholder_index;
        let request = exchange.into_request(files);

        let _ = self
            .event_tx
            .send(SessionEvent::ExchangeStart { placeholder_index });
        self.persist_off_thread().await;

        let (outcome, event) = match self.stream_reply(&request, placeholder_index).await {
            Ok(()) => (
                ExchangeOutcome::Completed {
                    index: placeholder_index,
                },
                SessionEvent::ExchangeEnd {
                    index: placeholder_index,
                },
            ),
            Err(error) => {
                if error.is_transport() {
                    tracing::warn!("Exchange for turn {} failed: {}", placeholder_index, error);
                } else {
                    tracing::error!("Exchange for turn {} failed: {}", placeholder_index, error);
                }
                let index = {
                    let mut state = self.state.lock();
                    let index = state
                        .conversation
                        .fail_exchange(placeholder_index, &self.config.apology);
                    if index == placeholder_index {
                        // The placeholder was replaced; feedback on it is stale
                        state.feedback.remove(placeholder_index);
                    }
                    index
                };
                let event = SessionEvent::Error {
                    index,
                    message: error.to_string(),
                };
                (ExchangeOutcome::Failed { index, error }, event)
            }
        };

        self.persist_off_thread().await;
        drop(guard);
        let _ = self.event_tx.send(event);
        outcome
    }

    async fn stream_reply(&self, request: &ChatRequest, index: usize) -> chatline_stream::Result<()> {
        let body = self.transport.open(request).await?;
        let mut updates = consume(body, index);

        while let Some(update) = updates.next().await {
            let update = update?;
            let applied = self.state.lock().conversation.apply(&update);
            if applied {
                let _ = self.event_tx.send(SessionEvent::Update { update });
            } else {
                tracing::debug!("Dropping update for missing turn {}", update.index());
            }
        }
        Ok(())
    }

    /// Start over with only the greeting, dropping attachments and feedback
    pub fn clear(&self) -> Result<()> {
        let _guard = self.handle.try_begin().ok_or(Error::Busy)?;
        {
            let mut state = self.state.lock();
            state.conversation.reset(&self.config.greeting);
            state.attachments.clear();
            state.feedback.clear();
        }
        self.persist();
        let _ = self.event_tx.send(SessionEvent::Cleared);
        Ok(())
    }

    /// Load files from disk into the attachment set.
    ///
    /// Files that are duplicates, too large or unreadable are reported in
    /// [`AttachReport::skipped`] and do not stop the rest.
    pub async fn attach_paths<I, P>(&self, paths: I) -> Result<AttachReport>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        if !self.config.features.file_upload {
            return Err(Error::FeatureDisabled("file upload"));
        }

        let limit = self.state.lock().attachments.max_file_size();
        let mut report = AttachReport::default();

        for path in paths {
            let path = path.as_ref();
            let name = Attachment::name_for(path);
            let duplicate = self.state.lock().attachments.contains(&name);
            let attached = if duplicate {
                Err(AttachError::Duplicate(name))
            } else {
                Attachment::from_path(path, limit).await.and_then(|attachment| {
                    self.state.lock().attachments.attach(attachment).map(|_| name)
                })
            };
            match attached {
                Ok(name) => report.added.push(name),
                Err(e) => {
                    tracing::debug!("Skipping attachment: {}", e);
                    report.skipped.push(e);
                }
            }
        }
        Ok(report)
    }

    /// Stage an already loaded attachment
    pub fn attach(&self, attachment: Attachment) -> Result<AttachReport> {
        if !self.config.features.file_upload {
            return Err(Error::FeatureDisabled("file upload"));
        }
        let name = attachment.name.clone();
        let mut report = AttachReport::default();
        match self.state.lock().attachments.attach(attachment) {
            Ok(()) => report.added.push(name),
            Err(e) => report.skipped.push(e),
        }
        Ok(report)
    }

    /// Remove the staged attachment at `index`
    pub fn detach(&self, index: usize) -> Option<Attachment> {
        self.state.lock().attachments.remove(index)
    }

    /// Toggle feedback on the bot turn at `index`, returning the new state
    pub fn record_feedback(&self, index: usize, feedback: Feedback) -> Result<Option<Feedback>> {
        let current = {
            let mut state = self.state.lock();
            let len = state.conversation.len();
            match state.conversation.get(index) {
                None => return Err(Error::TurnOutOfRange { index, len }),
                Some(turn) if !turn.is_bot() => return Err(Error::NotABotTurn { index }),
                Some(_) => {}
            }
            state.feedback.toggle(index, feedback)
        };
        self.persist();
        Ok(current)
    }

    /// Switch between light and dark. Allowed while a reply streams.
    pub fn toggle_theme(&self) -> Result<Theme> {
        if !self.config.features.theme_switching {
            return Err(Error::FeatureDisabled("theme switching"));
        }
        let theme = {
            let mut state = self.state.lock();
            state.theme = state.theme.toggle();
            state.theme
        };
        self.persist();
        let _ = self.event_tx.send(SessionEvent::ThemeChanged { theme });
        Ok(theme)
    }

    /// Context payload attached to the turn at `index`
    pub fn context(&self, index: usize) -> Result<Option<ContextPayload>> {
        if !self.config.features.show_context {
            return Err(Error::FeatureDisabled("context display"));
        }
        let state = self.state.lock();
        state
            .conversation
            .get(index)
            .map(|turn| turn.context.clone())
            .ok_or(Error::TurnOutOfRange {
                index,
                len: state.conversation.len(),
            })
    }

    /// Suggestion cards, offered only before the user has said anything
    pub fn suggestions(&self) -> Vec<SuggestionCard> {
        if !self.config.features.show_suggestion_cards {
            return Vec::new();
        }
        if self.state.lock().conversation.is_fresh() {
            self.config.suggestions.clone()
        } else {
            Vec::new()
        }
    }

    fn snapshot(&self) -> Option<Snapshot> {
        if !self.config.features.chat_history {
            return None;
        }
        let state = self.state.lock();
        Some(Snapshot::new(
            state.conversation.turns().to_vec(),
            state.feedback.clone(),
            state.theme,
        ))
    }

    fn persist(&self) {
        let Some(snapshot) = self.snapshot() else {
            return;
        };
        if let Err(e) = self.store.save(&snapshot) {
            tracing::warn!("Failed to save conversation: {}", e);
        }
    }

    /// Save from inside an exchange without blocking the runtime on store I/O
    async fn persist_off_thread(&self) {
        let Some(snapshot) = self.snapshot() else {
            return;
        };
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.save(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Failed to save conversation: {}", e),
            Err(e) => tracing::warn!("Save task did not finish: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JsonFileStore, MemoryStore};
    use async_stream::stream;
    use async_trait::async_trait;
    use chatline_stream::{ByteStream, ConversationUpdate};
    use std::collections::VecDeque;
    use tokio::sync::Notify;

    const HELLO_STREAM: &str = concat!(
        "data: {\"content\":\"Hel\"}\n",
        "data: {\"content\":\"lo\"}\n",
        "data: {\"type\":\"context\",\"data\":{\"score\":0.9}}\n",
    );

    enum Reply {
        Chunks(Vec<&'static str>),
        Status(u16),
        FailAfter(Vec<&'static str>),
    }

    /// Replays scripted replies and records every request
    #[derive(Default)]
    struct MockTransport {
        replies: Mutex<VecDeque<Reply>>,
        requests: Mutex<Vec<ChatRequest>>,
        gate: Option<Arc<Notify>>,
    }

    impl MockTransport {
        fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            })
        }

        fn gated(replies: Vec<Reply>, gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                gate: Some(gate),
                ..Default::default()
            })
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open(&self, request: &ChatRequest) -> chatline_stream::Result<ByteStream> {
            self.requests.lock().push(request.clone());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            let reply = self.replies.lock().pop_front();
            match reply {
                Some(Reply::Chunks(chunks)) => Ok(Box::pin(stream! {
                    for chunk in chunks {
                        yield Ok(chunk.as_bytes().to_vec());
                    }
                })),
                Some(Reply::Status(status)) => {
                    Err(chatline_stream::Error::status(status, "unavailable"))
                }
                Some(Reply::FailAfter(chunks)) => Ok(Box::pin(stream! {
                    for chunk in chunks {
                        yield Ok(chunk.as_bytes().to_vec());
                    }
                    yield Err(chatline_stream::Error::Body("connection reset".into()));
                })),
                None => Ok(Box::pin(stream! {
                    yield Ok(b"data: {\"content\":\"ok\"}\n".to_vec());
                })),
            }
        }
    }

    fn session_with(transport: Arc<MockTransport>) -> ChatSession {
        ChatSession::new(
            SessionConfig::default(),
            transport,
            Arc::new(MemoryStore::new()),
        )
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_send_streams_hello_reply() {
        let transport = MockTransport::new(vec![Reply::Chunks(vec![HELLO_STREAM])]);
        let session = session_with(transport.clone());
        let mut rx = session.subscribe();

        let outcome = session.send("hi").await.unwrap();
        assert!(matches!(outcome, ExchangeOutcome::Completed { index: 2 }));

        let turns = session.turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1], Turn::user("hi"));
        assert_eq!(turns[2].text, "Hello");
        assert_eq!(
            turns[2].context.as_ref().and_then(|c| c.get("score")),
            Some(&serde_json::json!(0.9))
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].content, "hi");
        assert_eq!(requests[0].history.len(), 1);

        let events = drain(&mut rx);
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], SessionEvent::ExchangeStart {
            placeholder_index: 2
        });
        assert_eq!(events[2], SessionEvent::Update {
            update: ConversationUpdate::Text {
                index: 2,
                text: "Hello".into()
            }
        });
        assert!(events[4].is_terminal());
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_edit_sends_truncated_history() {
        let transport = MockTransport::new(vec![]);
        let session = session_with(transport.clone());
        session.send("q1").await.unwrap();
        session.send("q2").await.unwrap();
        assert_eq!(session.turns().len(), 5);

        let outcome = session.edit(1, "q1 revised").await.unwrap();
        assert_eq!(outcome.index(), 2);

        let request = transport.requests().pop().unwrap();
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[1].text, "q1 revised");
        assert_eq!(request.content, "q1 revised");
        assert_eq!(session.turns().len(), 3);
    }

    #[tokio::test]
    async fn test_rejections_leave_state_alone() {
        let transport = MockTransport::new(vec![]);
        let session = session_with(transport.clone());
        session.send("q1").await.unwrap();
        let before = session.turns();

        assert!(matches!(session.send("   ").await, Err(Error::EmptyMessage)));
        assert!(matches!(
            session.edit(2, "x").await,
            Err(Error::NotAUserTurn { index: 2 })
        ));
        assert!(matches!(
            session.edit(7, "x").await,
            Err(Error::TurnOutOfRange { index: 7, .. })
        ));

        assert_eq!(session.turns(), before);
        assert_eq!(transport.requests().len(), 1);
        assert!(!session.is_busy());
    }

    #[tokio::test]
    async fn test_editing_disabled() {
        let config = SessionConfig {
            features: Features {
                message_editing: false,
                ..Features::default()
            },
            ..SessionConfig::default()
        };
        let session = ChatSession::new(
            config,
            MockTransport::new(vec![]),
            Arc::new(MemoryStore::new()),
        );
        session.send("q1").await.unwrap();

        assert!(matches!(
            session.edit(1, "x").await,
            Err(Error::FeatureDisabled(_))
        ));
    }

    #[tokio::test]
    async fn test_status_failure_yields_single_apology() {
        let transport = MockTransport::new(vec![Reply::Status(503)]);
        let session = session_with(transport);
        let mut rx = session.subscribe();

        let outcome = session.send("hi").await.unwrap();
        match outcome {
            ExchangeOutcome::Failed { index, error } => {
                assert_eq!(index, 2);
                assert_eq!(error.status_code(), Some(503));
            }
            other => panic!("expected failure, got {:?}", other),
        }

        let turns = session.turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[2], Turn::bot(DEFAULT_APOLOGY));
        assert!(!session.is_busy());

        let events = drain(&mut rx);
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Error { index: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_mid_stream_failure_keeps_partial_text() {
        let transport = MockTransport::new(vec![Reply::FailAfter(vec![
            "data: {\"content\":\"Par\"}\n",
        ])]);
        let session = session_with(transport);

        let outcome = session.send("hi").await.unwrap();
        assert!(!outcome.is_completed());
        assert_eq!(outcome.index(), 3);

        let turns = session.turns();
        assert_eq!(turns.len(), 4);
        assert_eq!(turns[2].text, "Par");
        assert_eq!(turns[3].text, DEFAULT_APOLOGY);
    }

    #[tokio::test]
    async fn test_second_send_while_busy_is_rejected() {
        let gate = Arc::new(Notify::new());
        let transport = MockTransport::gated(vec![Reply::Chunks(vec![HELLO_STREAM])], gate.clone());
        let session = Arc::new(session_with(transport.clone()));

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.send("first").await })
        };
        while !session.is_busy() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(session.send("second").await, Err(Error::Busy)));
        assert!(matches!(session.edit(1, "first, revised").await, Err(Error::Busy)));
        assert!(matches!(session.clear(), Err(Error::Busy)));

        // Theme toggles and attachments are still allowed
        assert_eq!(session.toggle_theme().unwrap(), Theme::Dark);
        let report = session.attach(Attachment::new("b.txt", "b")).unwrap();
        assert_eq!(report.added, vec!["b.txt".to_string()]);

        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.md");
        std::fs::write(&notes, "# notes").unwrap();
        let report = session.attach_paths([&notes]).await.unwrap();
        assert_eq!(report.added, vec!["notes.md".to_string()]);

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(outcome.is_completed());
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(transport.requests()[0].content, "first");
        assert_eq!(session.turns().len(), 3);
        assert_eq!(session.turns()[1].text, "first");
        assert_eq!(session.attachments(), vec!["b.txt".to_string(), "notes.md".to_string()]);
        assert!(session.handle().wait_for_idle_timeout(std::time::Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let store = Arc::new(MemoryStore::new());
        let session = ChatSession::new(
            SessionConfig::default(),
            MockTransport::new(vec![Reply::Chunks(vec![HELLO_STREAM])]),
            store.clone(),
        );
        session.send("hi").await.unwrap();
        session.record_feedback(2, Feedback::Positive).unwrap();
        session.toggle_theme().unwrap();

        let restored = ChatSession::new(
            SessionConfig::default(),
            MockTransport::new(vec![]),
            store.clone(),
        );
        assert_eq!(restored.turns(), session.turns());
        assert_eq!(restored.feedback().get(2), Some(Feedback::Positive));
        assert_eq!(restored.theme(), Theme::Dark);
    }

    #[tokio::test]
    async fn test_empty_snapshot_starts_fresh() {
        let store = Arc::new(MemoryStore::new());
        store
            .save(&Snapshot::new(Vec::new(), FeedbackLog::new(), Theme::Light))
            .unwrap();

        let session = ChatSession::new(SessionConfig::default(), MockTransport::new(vec![]), store);
        assert_eq!(session.turns(), vec![Turn::bot(DEFAULT_GREETING)]);
    }

    #[tokio::test]
    async fn test_feedback_dropped_on_edit_truncation() {
        let session = session_with(MockTransport::new(vec![]));
        session.send("q1").await.unwrap();
        session.send("q2").await.unwrap();

        session.record_feedback(2, Feedback::Positive).unwrap();
        session.record_feedback(4, Feedback::Negative).unwrap();
        assert!(matches!(
            session.record_feedback(1, Feedback::Positive),
            Err(Error::NotABotTurn { index: 1 })
        ));

        session.edit(3, "q2 again").await.unwrap();
        let feedback = session.feedback();
        assert_eq!(feedback.get(2), Some(Feedback::Positive));
        assert_eq!(feedback.get(4), None);
    }

    #[tokio::test]
    async fn test_suggestions_only_while_fresh() {
        let session = session_with(MockTransport::new(vec![]));
        let cards = session.suggestions();
        assert_eq!(cards.len(), 4);

        session.send(&cards[0].question).await.unwrap();
        assert!(session.suggestions().is_empty());

        session.clear().unwrap();
        assert_eq!(session.suggestions().len(), 4);
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let session = session_with(MockTransport::new(vec![]));
        let mut rx = session.subscribe();
        session.send("q1").await.unwrap();
        session.record_feedback(2, Feedback::Negative).unwrap();
        session.attach(Attachment::new("a.txt", "a")).unwrap();

        session.clear().unwrap();
        assert_eq!(session.turns(), vec![Turn::bot(DEFAULT_GREETING)]);
        assert!(session.feedback().is_empty());
        assert!(session.attachments().is_empty());
        assert_eq!(drain(&mut rx).last(), Some(&SessionEvent::Cleared));
    }

    #[tokio::test]
    async fn test_attachments_reported_and_sent() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.md");
        std::fs::write(&notes, "# notes").unwrap();

        let transport = MockTransport::new(vec![]);
        let session = session_with(transport.clone());
        let report = session
            .attach_paths([notes.clone(), notes, dir.path().join("missing.txt")])
            .await
            .unwrap();

        assert_eq!(report.added, vec!["notes.md".to_string()]);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.skipped[0], AttachError::Duplicate("notes.md".into()));

        session.send("look at this").await.unwrap();
        let request = transport.requests().pop().unwrap();
        assert_eq!(request.files.len(), 1);
        assert_eq!(request.files[0].mime_type, "text/markdown");
        assert_eq!(session.attachments(), vec!["notes.md".to_string()]);
    }

    #[tokio::test]
    async fn test_context_lookup() {
        let session = session_with(MockTransport::new(vec![Reply::Chunks(vec![HELLO_STREAM])]));
        session.send("hi").await.unwrap();

        assert!(session.context(2).unwrap().is_some());
        assert!(session.context(1).unwrap().is_none());
        assert!(matches!(
            session.context(9),
            Err(Error::TurnOutOfRange { index: 9, len: 3 })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_name_checked_before_reading() {
        let config = SessionConfig {
            max_file_size: 10,
            ..SessionConfig::default()
        };
        let session = ChatSession::new(
            config,
            MockTransport::new(vec![]),
            Arc::new(MemoryStore::new()),
        );
        session.attach(Attachment::new("a.txt", "short")).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let grown = dir.path().join("a.txt");
        std::fs::write(&grown, "now well past the limit!").unwrap();

        let report = session.attach_paths([grown]).await.unwrap();
        assert!(report.added.is_empty());
        assert_eq!(report.skipped, vec![AttachError::Duplicate("a.txt".into())]);
    }

    #[tokio::test]
    async fn test_feedback_on_replaced_placeholder_is_dropped() {
        let gate = Arc::new(Notify::new());
        let transport = MockTransport::gated(vec![Reply::Status(500)], gate.clone());
        let session = Arc::new(session_with(transport));

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.send("hi").await })
        };
        while !session.is_busy() {
            tokio::task::yield_now().await;
        }

        // Feedback on the placeholder is accepted while it is still blank
        assert_eq!(
            session.record_feedback(2, Feedback::Negative).unwrap(),
            Some(Feedback::Negative)
        );

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.index(), 2);
        assert_eq!(session.turns()[2].text, DEFAULT_APOLOGY);
        assert_eq!(session.feedback().get(2), None);
    }

    #[tokio::test]
    async fn test_history_disabled_never_touches_store() {
        let store = Arc::new(MemoryStore::new());
        let saved = Snapshot::new(
            vec![Turn::bot("Hello!"), Turn::user("old"), Turn::bot("reply")],
            FeedbackLog::new(),
            Theme::Dark,
        );
        store.save(&saved).unwrap();

        let config = SessionConfig {
            features: Features {
                chat_history: false,
                ..Features::default()
            },
            ..SessionConfig::default()
        };
        let session = ChatSession::new(config, MockTransport::new(vec![]), store.clone());
        assert_eq!(session.turns(), vec![Turn::bot(DEFAULT_GREETING)]);
        assert_eq!(session.theme(), Theme::Light);

        session.send("new").await.unwrap();
        session.toggle_theme().unwrap();

        let stored = store.load().unwrap().unwrap();
        assert_eq!(stored.turns, saved.turns);
        assert_eq!(stored.theme, Theme::Dark);
    }

    #[tokio::test]
    async fn test_exchange_saved_to_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.json");
        let session = ChatSession::new(
            SessionConfig::default(),
            MockTransport::new(vec![Reply::Chunks(vec![HELLO_STREAM])]),
            Arc::new(JsonFileStore::new(path.clone())),
        );
        session.send("hi").await.unwrap();

        let restored = JsonFileStore::new(path).load().unwrap().unwrap();
        assert_eq!(restored.turns, session.turns());
        assert_eq!(restored.turns[2].text, "Hello");
    }
}
