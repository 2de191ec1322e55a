//! Error types for the client store.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in the client store or during sync.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Storage error in the local store.
    #[error("storage error: {0}")]
    Storage(#[from] driftsync_storage::StorageError),

    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// Codec error on a request or response body.
    #[error("codec error: {0}")]
    Codec(#[from] driftsync_protocol::ProtocolError),

    /// The server's response violated the protocol.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server refused a push.
    #[error("push rejected by server: {0}")]
    Rejected(String),

    /// A sync operation was requested but no transport is configured.
    #[error("no transport configured")]
    NoTransport,
}

impl ClientError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport { retryable: true, .. })
    }
}
