//! Mutations: the unit of optimistic change.

use crate::operation::Operation;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ordered, atomically-applied batch of operations produced by one
/// client-side transaction.
///
/// `(client_id, mutation_id)` identifies a mutation globally and is the
/// unit of idempotency on the server and the unit of undo during rebase.
///
/// # Invariants
///
/// - `mutation_id` is a per-client counter starting at 1
/// - a client never reuses or skips an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// The client that produced this mutation.
    pub client_id: Uuid,
    /// Per-client strictly increasing counter, starting at 1.
    pub mutation_id: u64,
    /// The recorded operations, in execution order.
    pub operations: Vec<Operation>,
}

impl Mutation {
    /// Creates a new mutation.
    pub fn new(client_id: Uuid, mutation_id: u64, operations: Vec<Operation>) -> Self {
        Self {
            client_id,
            mutation_id,
            operations,
        }
    }

    /// Returns the write operations in this mutation, in order.
    pub fn writes(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(|op| op.is_write())
    }
}
