//! Error types for the server engine.

use thiserror::Error;
use uuid::Uuid;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while applying mutations or serving requests.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Storage error while applying a mutation or scanning for a patch.
    #[error("storage error: {0}")]
    Storage(#[from] driftsync_storage::StorageError),

    /// Codec error on a request or response body.
    #[error("codec error: {0}")]
    Codec(#[from] driftsync_protocol::ProtocolError),

    /// A client pushed a mutation id that skips ahead of its last
    /// applied one. Treated as sync-state corruption, never applied.
    #[error("mutation id gap for client {client_id}: expected {expected}, got {got}")]
    MutationGap {
        /// The offending client.
        client_id: Uuid,
        /// The next id the server would accept.
        expected: u64,
        /// The id the client sent.
        got: u64,
    },

    /// A request arrived for an endpoint the server does not serve.
    #[error("unknown endpoint: {0}")]
    UnknownEndpoint(String),
}
