//! HTTP transport implementation.
//!
//! The actual HTTP client is abstracted via a trait so different
//! implementations (reqwest, hyper, ureq, a loopback for tests) can
//! carry the CBOR bodies.

use crate::error::{ClientError, ClientResult};
use crate::transport::SyncTransport;
use driftsync_protocol::{PullRequest, PullResponse, PushRequest, PushResponse};
use parking_lot::RwLock;

/// Endpoint path for push requests.
pub const PUSH_ENDPOINT: &str = "/sync/push";
/// Endpoint path for pull requests.
pub const PULL_ENDPOINT: &str = "/sync/pull";

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport.
pub trait HttpClient: Send + Sync {
    /// Sends a POST request and returns the response body.
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String>;
}

/// HTTP-based sync transport.
///
/// Uses CBOR encoding for request/response bodies.
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the sync server (e.g., "https://sync.example.com").
    base_url: String,
    /// HTTP client implementation.
    client: C,
    /// Last transport error message.
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn post_body(&self, endpoint: &str, body: Vec<u8>) -> ClientResult<Vec<u8>> {
        let url = format!("{}{}", self.base_url, endpoint);
        match self.client.post(&url, body) {
            Ok(response) => {
                *self.last_error.write() = None;
                Ok(response)
            }
            Err(message) => {
                *self.last_error.write() = Some(message.clone());
                Err(ClientError::transport_retryable(message))
            }
        }
    }
}

impl<C: HttpClient> SyncTransport for HttpTransport<C> {
    fn push(&self, request: &PushRequest) -> ClientResult<PushResponse> {
        let response = self.post_body(PUSH_ENDPOINT, request.encode()?)?;
        Ok(PushResponse::decode(&response)?)
    }

    fn pull(&self, request: &PullRequest) -> ClientResult<PullResponse> {
        let response = self.post_body(PULL_ENDPOINT, request.encode()?)?;
        Ok(PullResponse::decode(&response)?)
    }
}

/// Trait for servers that can handle loopback requests.
pub trait LoopbackServer {
    /// Handles a POST request and returns the response body.
    fn handle_post(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, String>;
}

/// A loopback HTTP client that routes requests directly to a sync server.
///
/// Useful for testing without actual network overhead.
pub struct LoopbackClient<S: LoopbackServer> {
    server: S,
}

impl<S: LoopbackServer + Send + Sync> LoopbackClient<S> {
    /// Creates a new loopback client connected to the given server.
    pub fn new(server: S) -> Self {
        Self { server }
    }
}

impl<S: LoopbackServer + Send + Sync> HttpClient for LoopbackClient<S> {
    fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String> {
        // Extract path from URL
        let path = url.find("/sync/").map(|i| &url[i..]).unwrap_or(url);
        self.server.handle_post(path, &body)
    }
}
