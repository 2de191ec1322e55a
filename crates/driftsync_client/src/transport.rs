//! Transport layer abstraction for sync operations.

use crate::error::{ClientError, ClientResult};
use driftsync_protocol::{PullRequest, PullResponse, PushRequest, PushResponse};
use parking_lot::Mutex;

/// A sync transport handles communication with the sync server.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, WebSocket, mock for testing, etc.).
pub trait SyncTransport: Send + Sync {
    /// Pushes the client's mutation queue to the server.
    fn push(&self, request: &PushRequest) -> ClientResult<PushResponse>;

    /// Pulls a patch from the server.
    fn pull(&self, request: &PullRequest) -> ClientResult<PullResponse>;
}

/// A mock transport for testing.
#[derive(Default)]
pub struct MockTransport {
    push_response: Mutex<Option<PushResponse>>,
    pull_response: Mutex<Option<PullResponse>>,
    fail_push: Mutex<bool>,
    fail_pull: Mutex<bool>,
    pushed: Mutex<Vec<PushRequest>>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the push response.
    pub fn set_push_response(&self, response: PushResponse) {
        *self.push_response.lock() = Some(response);
    }

    /// Sets the pull response.
    pub fn set_pull_response(&self, response: PullResponse) {
        *self.pull_response.lock() = Some(response);
    }

    /// Makes subsequent pushes fail with a retryable transport error.
    pub fn set_fail_push(&self, fail: bool) {
        *self.fail_push.lock() = fail;
    }

    /// Makes subsequent pulls fail with a retryable transport error.
    pub fn set_fail_pull(&self, fail: bool) {
        *self.fail_pull.lock() = fail;
    }

    /// The push requests received so far.
    pub fn pushed(&self) -> Vec<PushRequest> {
        self.pushed.lock().clone()
    }
}

impl SyncTransport for MockTransport {
    fn push(&self, request: &PushRequest) -> ClientResult<PushResponse> {
        if *self.fail_push.lock() {
            return Err(ClientError::transport_retryable("mock push failure"));
        }
        self.pushed.lock().push(request.clone());
        self.push_response
            .lock()
            .clone()
            .ok_or_else(|| ClientError::Protocol("no mock push response set".into()))
    }

    fn pull(&self, _request: &PullRequest) -> ClientResult<PullResponse> {
        if *self.fail_pull.lock() {
            return Err(ClientError::transport_retryable("mock pull failure"));
        }
        self.pull_response
            .lock()
            .clone()
            .ok_or_else(|| ClientError::Protocol("no mock pull response set".into()))
    }
}
