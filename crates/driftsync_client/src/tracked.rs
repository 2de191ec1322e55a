//! Read/write tracking over a storage transaction.

use crate::error::ClientResult;
use driftsync_protocol::Operation;
use driftsync_storage::StorageTransaction;
use serde_json::Value;

/// A storage transaction that records every operation performed through it.
///
/// Mutation callbacks get the recorded writes turned into a [`Mutation`];
/// subscription callbacks get the recorded reads turned into dependency
/// tokens. Updates and deletes capture the previous value at write time,
/// so the log can later be reversed during a rebase.
///
/// [`Mutation`]: driftsync_protocol::Mutation
pub struct TrackedTransaction<'a> {
    tx: Box<dyn StorageTransaction + 'a>,
    operations: Vec<Operation>,
}

impl<'a> TrackedTransaction<'a> {
    pub(crate) fn new(tx: Box<dyn StorageTransaction + 'a>) -> Self {
        Self {
            tx,
            operations: Vec::new(),
        }
    }

    /// Reads a single object.
    pub fn get(&mut self, namespace: &str, id: &str) -> ClientResult<Option<Value>> {
        let value = self.tx.get(namespace, id)?;
        self.operations.push(Operation::Get {
            namespace: namespace.into(),
            id: id.into(),
        });
        Ok(value)
    }

    /// Reads all objects in a namespace, ordered by id.
    pub fn get_all(&mut self, namespace: &str) -> ClientResult<Vec<(String, Value)>> {
        let values = self.tx.get_all(namespace)?;
        self.operations.push(Operation::GetAll {
            namespace: namespace.into(),
        });
        Ok(values)
    }

    /// Reads all ids in a namespace, in order.
    pub fn get_all_keys(&mut self, namespace: &str) -> ClientResult<Vec<String>> {
        let keys = self.tx.get_all_keys(namespace)?;
        self.operations.push(Operation::GetAllKeys {
            namespace: namespace.into(),
        });
        Ok(keys)
    }

    /// Creates an object.
    ///
    /// Put records no previous value and reverses to a delete, so callers
    /// use it for creation; replacing an existing object goes through
    /// [`update`](Self::update).
    pub fn put(&mut self, namespace: &str, id: &str, data: Value) -> ClientResult<()> {
        self.tx.put(namespace, id, data.clone())?;
        self.operations.push(Operation::Put {
            namespace: namespace.into(),
            id: id.into(),
            data,
        });
        Ok(())
    }

    /// Replaces an object, capturing its previous value.
    pub fn update(&mut self, namespace: &str, id: &str, data: Value) -> ClientResult<()> {
        let prev_data = self.tx.get(namespace, id)?;
        self.tx.update(namespace, id, data.clone())?;
        self.operations.push(Operation::Update {
            namespace: namespace.into(),
            id: id.into(),
            data,
            prev_data,
        });
        Ok(())
    }

    /// Deletes an object, capturing its previous value.
    pub fn delete(&mut self, namespace: &str, id: &str) -> ClientResult<()> {
        let prev_data = self.tx.get(namespace, id)?;
        self.tx.delete(namespace, id)?;
        self.operations.push(Operation::Delete {
            namespace: namespace.into(),
            id: id.into(),
            prev_data,
        });
        Ok(())
    }

    /// Commits the underlying transaction and yields the recorded
    /// operations.
    pub(crate) fn finish(self) -> ClientResult<Vec<Operation>> {
        self.tx.commit()?;
        Ok(self.operations)
    }

    /// Discards the underlying transaction and yields the recorded
    /// operations. Used for read-only callbacks.
    pub(crate) fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}
