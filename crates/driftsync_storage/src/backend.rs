//! Storage backend trait definitions.

use crate::error::StorageResult;
use serde_json::Value;

/// A keyed storage backend for DriftSync.
///
/// Backends partition entities into named **namespaces**; within a
/// namespace, entities are addressed by string id. Entity values are
/// opaque JSON values - backends do not interpret them, and any schema
/// validation happens above this layer.
///
/// # Invariants
///
/// - The namespace set is fixed at construction
/// - `begin` opens a transaction whose writes are invisible to other
///   transactions until `commit`
/// - Referencing an undeclared namespace is an error, never a no-op
/// - Backends must be `Send + Sync` for shared access
///
/// # Implementors
///
/// - [`super::MemoryBackend`] - In-memory store for tests and ephemeral use
pub trait StorageBackend: Send + Sync {
    /// Opens a new transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot open a transaction.
    fn begin(&self) -> StorageResult<Box<dyn StorageTransaction + '_>>;

    /// Returns the declared namespaces in sorted order.
    fn namespaces(&self) -> Vec<String>;
}

/// A transaction over a [`StorageBackend`].
///
/// Writes are buffered and applied atomically on [`commit`]; a dropped
/// transaction discards its writes. Reads observe the transaction's own
/// uncommitted writes layered over the committed state.
///
/// [`commit`]: StorageTransaction::commit
pub trait StorageTransaction {
    /// Reads the value stored under `id`, if any.
    fn get(&mut self, namespace: &str, id: &str) -> StorageResult<Option<Value>>;

    /// Returns all `(id, value)` pairs in the namespace, ordered by id.
    fn get_all(&mut self, namespace: &str) -> StorageResult<Vec<(String, Value)>>;

    /// Returns all ids in the namespace, in order.
    fn get_all_keys(&mut self, namespace: &str) -> StorageResult<Vec<String>>;

    /// Stores `value` under `id`, creating or replacing it.
    fn put(&mut self, namespace: &str, id: &str, value: Value) -> StorageResult<()>;

    /// Replaces the value stored under `id`.
    ///
    /// A missing id is treated as a create: rebase replay must not fail
    /// when the base object was removed by a newer server state.
    fn update(&mut self, namespace: &str, id: &str, value: Value) -> StorageResult<()>;

    /// Removes the value stored under `id`. Removing a missing id is a no-op.
    fn delete(&mut self, namespace: &str, id: &str) -> StorageResult<()>;

    /// Commits all buffered writes atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the writes cannot be applied; in that case
    /// none of them are.
    fn commit(self: Box<Self>) -> StorageResult<()>;
}
