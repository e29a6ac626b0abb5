//! Persisted session snapshots

use std::fs;
use std::path::{Path, PathBuf};

use chatline_stream::Turn;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::feedback::FeedbackLog;
use crate::theme::Theme;

/// Snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to restore a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub turns: Vec<Turn>,
    #[serde(default)]
    pub feedback: FeedbackLog,
    #[serde(default)]
    pub theme: Theme,
}

impl Snapshot {
    /// Capture the current state, stamped now
    pub fn new(turns: Vec<Turn>, feedback: FeedbackLog, theme: Theme) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            turns,
            feedback,
            theme,
        }
    }
}

/// Where snapshots are kept
pub trait ConversationStore: Send + Sync {
    /// Load the last snapshot, if one was saved
    fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// One JSON file on disk
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default snapshot location under the user data dir
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("chatline")
            .join("conversation.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new(Self::default_path())
    }
}

impl ConversationStore for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        tracing::debug!(
            "Loaded {} turns from {}",
            snapshot.turns.len(),
            self.path.display()
        );
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write beside the target, then rename over it
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Keeps the snapshot in memory only
#[derive(Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<Snapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.snapshot.lock().clone())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.snapshot.lock() = Some(snapshot.clone());
        Ok(())
    }
}
