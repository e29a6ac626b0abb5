//! Files attached to outgoing messages

use std::path::{Path, PathBuf};

use chatline_stream::FileAttachment;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

/// Default per-file size limit (5 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// A file loaded for sending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub content: String,
    pub size: u64,
    pub mime_type: String,
}

/// Why a file was not attached
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachError {
    #[error("{0} is already attached")]
    Duplicate(String),

    #[error("{name} is {size} bytes (limit {limit})")]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error("cannot read {name}: {reason}")]
    Unreadable { name: String, reason: String },
}

impl AttachError {
    /// Name of the file the error is about
    pub fn name(&self) -> &str {
        match self {
            AttachError::Duplicate(name) => name,
            AttachError::TooLarge { name, .. } => name,
            AttachError::Unreadable { name, .. } => name,
        }
    }
}

/// Result of attaching a batch of paths
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttachReport {
    /// Names that were attached
    pub added: Vec<String>,
    /// Files left out, with the reason
    pub skipped: Vec<AttachError>,
}

impl Attachment {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let name = name.into();
        let content = content.into();
        Self {
            mime_type: guess_mime(&name).to_string(),
            size: content.len() as u64,
            name,
            content,
        }
    }

    /// Load a file as text. Invalid UTF-8 is replaced, not rejected.
    ///
    /// Files over `limit` bytes are refused before they are read.
    pub async fn from_path(path: &Path, limit: u64) -> Result<Self, AttachError> {
        let path = expand_tilde(path);
        let name = Self::name_for(&path);

        let unreadable = |e: std::io::Error| AttachError::Unreadable {
            name: name.clone(),
            reason: e.to_string(),
        };

        let metadata = fs::metadata(&path).await.map_err(unreadable)?;
        if !metadata.is_file() {
            return Err(AttachError::Unreadable {
                name,
                reason: "not a regular file".to_string(),
            });
        }
        if metadata.len() > limit {
            return Err(AttachError::TooLarge {
                name,
                size: metadata.len(),
                limit,
            });
        }

        let bytes = fs::read(&path).await.map_err(unreadable)?;
        Ok(Self {
            mime_type: guess_mime(&name).to_string(),
            size: bytes.len() as u64,
            content: String::from_utf8_lossy(&bytes).into_owned(),
            name,
        })
    }

    /// Name a file at `path` is attached under
    pub fn name_for(path: &Path) -> String {
        let path = expand_tilde(path);
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }

    pub fn to_wire(&self) -> FileAttachment {
        FileAttachment {
            name: self.name.clone(),
            content: self.content.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// MIME type from the file extension; unknown extensions are sent as text
pub fn guess_mime(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "md" | "markdown" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "js" | "mjs" | "jsx" => "text/javascript",
        "ts" | "tsx" => "application/typescript",
        "json" => "application/json",
        "xml" => "application/xml",
        "yaml" | "yml" => "application/yaml",
        "toml" => "application/toml",
        "py" => "text/x-python",
        "rs" => "text/x-rust",
        "sh" => "application/x-sh",
        "pdf" => "application/pdf",
        _ => "text/plain",
    }
}

/// Attachments staged for the next send, in insertion order
#[derive(Debug, Clone)]
pub struct AttachmentSet {
    files: Vec<Attachment>,
    max_file_size: u64,
}

impl AttachmentSet {
    pub fn new(max_file_size: u64) -> Self {
        Self {
            files: Vec::new(),
            max_file_size,
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }

    /// Add a loaded file. Names must be unique and within the size limit.
    pub fn attach(&mut self, attachment: Attachment) -> Result<(), AttachError> {
        if self.contains(&attachment.name) {
            return Err(AttachError::Duplicate(attachment.name));
        }
        if attachment.size > self.max_file_size {
            return Err(AttachError::TooLarge {
                name: attachment.name,
                size: attachment.size,
                limit: self.max_file_size,
            });
        }
        self.files.push(attachment);
        Ok(())
    }

    /// Remove the file at `index`
    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn files(&self) -> &[Attachment] {
        &self.files
    }

    pub fn names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }

    pub fn to_wire(&self) -> Vec<FileAttachment> {
        self.files.iter().map(Attachment::to_wire).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for AttachmentSet {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}
