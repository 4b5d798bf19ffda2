//! Error types shared across ytnotify crates.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, YtNotifyError>;

#[derive(Debug, Error)]
pub enum YtNotifyError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Video platform error: {0}")]
    Platform(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),

    #[error("Hub error: {0}")]
    Hub(String),

    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),

    #[error("Feed decode error: {0}")]
    Feed(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Classified failure of a messaging-platform call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagingError {
    /// An edit carried exactly the content the message already has.
    #[error("message is not modified")]
    NotModified,

    #[error("API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl MessagingError {
    pub fn is_not_modified(&self) -> bool {
        matches!(self, MessagingError::NotModified)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecorderError {
    #[error("recorder timed out")]
    Timeout,

    #[error("recorder replied with status {0}")]
    Status(u16),

    #[error("recorder transport error: {0}")]
    Transport(String),
}
