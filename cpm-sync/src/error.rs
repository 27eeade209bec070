//! Error types for the replication layer.

use thiserror::Error;

/// Result type for replication operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in replication, trust and admin operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Filesystem or stream error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or oversized frame on a connection.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Trust store persistence error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// No registered bundle owned by the player matches the given name.
    #[error("no custom models named '{model}' found for player '{owner}'")]
    NoMatchingModel { owner: String, model: String },

    /// Admin selector string contained no recognised flag.
    #[error("no valid flags in '{0}'. Allowed flags: 't' texture, 'h' shape, 'o' sound")]
    InvalidSelector(String),

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,
}
