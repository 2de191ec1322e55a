//! Wire messages for the push/pull protocol.
//!
//! Messages are serde types encoded as CBOR on the wire. Each carries its
//! own `encode`/`decode` pair; transports move opaque byte bodies.

use crate::error::{ProtocolError, ProtocolResult};
use crate::mutation::Mutation;
use crate::operation::Operation;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn encode_cbor<T: Serialize>(message: &T) -> ProtocolResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(message, &mut bytes).map_err(ProtocolError::encode)?;
    Ok(bytes)
}

fn decode_cbor<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    ciborium::from_reader(bytes).map_err(ProtocolError::decode)
}

/// Push request: the client's entire unconfirmed mutation queue.
///
/// Safe to re-send: the server dedups by `(client_id, mutation_id)`, so a
/// retry of already-confirmed mutations is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    /// Unconfirmed mutations, in creation order.
    pub mutations: Vec<Mutation>,
}

impl PushRequest {
    /// Creates a push request.
    pub fn new(mutations: Vec<Mutation>) -> Self {
        Self { mutations }
    }

    /// Encodes to CBOR bytes.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        encode_cbor(self)
    }

    /// Decodes from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        decode_cbor(bytes)
    }
}

/// Push acknowledgement.
///
/// Push is logically void; this envelope only distinguishes server
/// refusal (an invariant violation such as a mutation id gap) from
/// transport failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushResponse {
    /// Whether the server accepted the batch.
    pub success: bool,
    /// Refusal reason when `success` is false.
    pub error: Option<String>,
}

impl PushResponse {
    /// Creates an accepting response.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// Creates a refusing response.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }

    /// Encodes to CBOR bytes.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        encode_cbor(self)
    }

    /// Decodes from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        decode_cbor(bytes)
    }
}

/// Pull request: asks for a patch relative to the client's last synced
/// version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
    /// The requesting client.
    pub client_id: Uuid,
    /// The server version as of the client's last successful pull.
    pub db_version_at_last_sync: u64,
}

impl PullRequest {
    /// Creates a pull request.
    pub fn new(client_id: Uuid, db_version_at_last_sync: u64) -> Self {
        Self {
            client_id,
            db_version_at_last_sync,
        }
    }

    /// Encodes to CBOR bytes.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        encode_cbor(self)
    }

    /// Decodes from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        decode_cbor(bytes)
    }
}

/// Pull response: the catch-up patch plus the server's view of the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    /// Echo of the requesting client id.
    pub client_id: Uuid,
    /// Put/delete operations bringing the client to `db_version`.
    pub patch: Vec<Operation>,
    /// The last mutation id the server has applied for this client
    /// (0 if the client is unknown).
    pub last_mutation_id: u64,
    /// The server's current global version.
    pub db_version: u64,
}

impl PullResponse {
    /// Creates a pull response.
    pub fn new(client_id: Uuid, patch: Vec<Operation>, last_mutation_id: u64, db_version: u64) -> Self {
        Self {
            client_id,
            patch,
            last_mutation_id,
            db_version,
        }
    }

    /// Encodes to CBOR bytes.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        encode_cbor(self)
    }

    /// Decodes from CBOR bytes.
    pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
        decode_cbor(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_request_roundtrip() {
        let mutation = Mutation::new(
            Uuid::new_v4(),
            1,
            vec![Operation::Put {
                namespace: "nodes".into(),
                id: "1".into(),
                data: json!({ "text": "test" }),
            }],
        );
        let request = PushRequest::new(vec![mutation]);

        let bytes = request.encode().unwrap();
        let decoded = PushRequest::decode(&bytes).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn pull_roundtrip() {
        let client_id = Uuid::new_v4();
        let request = PullRequest::new(client_id, 7);

        let bytes = request.encode().unwrap();
        let decoded = PullRequest::decode(&bytes).unwrap();
        assert_eq!(decoded, request);

        let response = PullResponse::new(
            client_id,
            vec![Operation::Delete {
                namespace: "nodes".into(),
                id: "1".into(),
                prev_data: None,
            }],
            3,
            9,
        );

        let bytes = response.encode().unwrap();
        let decoded = PullResponse::decode(&bytes).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn push_response_shapes() {
        let ok = PushResponse::ok();
        assert!(ok.success);
        assert!(ok.error.is_none());

        let rejected = PushResponse::rejected("mutation id gap");
        assert!(!rejected.success);
        assert_eq!(rejected.error.as_deref(), Some("mutation id gap"));
    }

    #[test]
    fn decode_garbage_fails() {
        let result = PullResponse::decode(&[0xFF, 0x00, 0x13]);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
