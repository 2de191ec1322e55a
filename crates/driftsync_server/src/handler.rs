//! Request handling for the sync endpoints.

use crate::error::{ServerError, ServerResult};
use crate::store::ServerStore;
use driftsync_protocol::{PullRequest, PullResponse, PushRequest, PushResponse};
use std::sync::Arc;
use tracing::debug;

/// Endpoint path for push requests.
pub const PUSH_ENDPOINT: &str = "/sync/push";
/// Endpoint path for pull requests.
pub const PULL_ENDPOINT: &str = "/sync/pull";

/// Handler for sync requests against a [`ServerStore`].
///
/// Typed entry points serve in-process callers; `handle_request` frames
/// the same calls as CBOR bodies for an HTTP (or loopback) front end.
pub struct SyncHandler {
    store: Arc<ServerStore>,
}

impl SyncHandler {
    /// Creates a handler over the given store.
    pub fn new(store: Arc<ServerStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<ServerStore> {
        &self.store
    }

    /// Handles a push request.
    ///
    /// A mutation id gap is reported in the response envelope rather than
    /// as a transport-level failure, so the client can distinguish server
    /// refusal from a network error.
    pub fn handle_push(&self, request: PushRequest) -> ServerResult<PushResponse> {
        match self.store.apply_client_mutations(&request.mutations) {
            Ok(()) => Ok(PushResponse::ok()),
            Err(gap @ ServerError::MutationGap { .. }) => {
                debug!(error = %gap, "refusing push");
                Ok(PushResponse::rejected(gap.to_string()))
            }
            Err(other) => Err(other),
        }
    }

    /// Handles a pull request.
    pub fn handle_pull(&self, request: PullRequest) -> ServerResult<PullResponse> {
        self.store
            .generate_patch(request.db_version_at_last_sync, request.client_id)
    }

    /// Handles a framed request: decodes the CBOR body for `path`,
    /// dispatches, and encodes the response.
    pub fn handle_request(&self, path: &str, body: &[u8]) -> ServerResult<Vec<u8>> {
        match path {
            PUSH_ENDPOINT => {
                let request = PushRequest::decode(body)?;
                Ok(self.handle_push(request)?.encode()?)
            }
            PULL_ENDPOINT => {
                let request = PullRequest::decode(body)?;
                Ok(self.handle_pull(request)?.encode()?)
            }
            other => Err(ServerError::UnknownEndpoint(other.into())),
        }
    }
}
