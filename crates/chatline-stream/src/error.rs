//! Error types for chatline-stream

use thiserror::Error;

/// Result type alias using chatline-stream Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the chat endpoint
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be read to the end
    #[error("Body read failed: {0}")]
    Body(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a status error from a code and response body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// HTTP status, if the endpoint answered with one
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Status { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether this error came from the network or the endpoint, as opposed
    /// to local configuration
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Status { .. } | Error::Body(_)
        )
    }
}
