//! Error types for chatline-session

use thiserror::Error;

/// Result type alias using chatline-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during session operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the streaming layer
    #[error(transparent)]
    Stream(#[from] chatline_stream::Error),

    /// A reply is still streaming
    #[error("A reply is still streaming; wait for it to finish")]
    Busy,

    /// Submitted text is blank
    #[error("Message is empty")]
    EmptyMessage,

    /// Index does not name a turn
    #[error("No turn at index {index} (conversation has {len} turns)")]
    TurnOutOfRange { index: usize, len: usize },

    /// Only user turns can be edited
    #[error("Turn {index} was not written by the user")]
    NotAUserTurn { index: usize },

    /// Only bot turns take feedback
    #[error("Turn {index} is not a bot reply")]
    NotABotTurn { index: usize },

    /// Feature switched off in configuration
    #[error("{0} is disabled")]
    FeatureDisabled(&'static str),

    /// Store could not be read or written
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store contents could not be (de)serialized
    #[error("Store format error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the operation was refused before touching any state.
    /// Failures of an accepted exchange are reported as an outcome instead.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::Busy
                | Error::EmptyMessage
                | Error::TurnOutOfRange { .. }
                | Error::NotAUserTurn { .. }
                | Error::NotABotTurn { .. }
                | Error::FeatureDisabled(_)
        )
    }
}
