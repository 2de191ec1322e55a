//! In-memory storage backend.

use crate::backend::{StorageBackend, StorageTransaction};
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;

/// An in-memory storage backend.
///
/// Namespaces are declared at construction; each holds an ordered map of
/// id to value, so iteration order is deterministic. Suitable for:
/// - Unit and integration tests
/// - Ephemeral client stores that don't need persistence
/// - Server stores in single-process deployments
///
/// # Thread Safety
///
/// The backend is thread-safe and can be shared across threads. An open
/// transaction buffers its writes privately and publishes them under the
/// write lock on commit.
///
/// # Example
///
/// ```rust
/// use driftsync_storage::{MemoryBackend, StorageBackend};
/// use serde_json::json;
///
/// let backend = MemoryBackend::new(["nodes", "relations"]);
/// let mut tx = backend.begin().unwrap();
/// tx.put("nodes", "1", json!({ "text": "root" })).unwrap();
/// assert!(tx.get("nodes", "1").unwrap().is_some());
/// tx.commit().unwrap();
/// ```
#[derive(Debug)]
pub struct MemoryBackend {
    stores: RwLock<BTreeMap<String, BTreeMap<String, Value>>>,
}

impl MemoryBackend {
    /// Creates a backend with the given namespaces, all empty.
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stores = namespaces
            .into_iter()
            .map(|ns| (ns.into(), BTreeMap::new()))
            .collect();
        Self {
            stores: RwLock::new(stores),
        }
    }

    /// Returns the number of entities stored in a namespace.
    pub fn len(&self, namespace: &str) -> StorageResult<usize> {
        let stores = self.stores.read();
        let store = stores
            .get(namespace)
            .ok_or_else(|| StorageError::UnknownNamespace(namespace.into()))?;
        Ok(store.len())
    }

    /// Returns true if the namespace holds no entities.
    pub fn is_empty(&self, namespace: &str) -> StorageResult<bool> {
        Ok(self.len(namespace)? == 0)
    }
}

impl StorageBackend for MemoryBackend {
    fn begin(&self) -> StorageResult<Box<dyn StorageTransaction + '_>> {
        Ok(Box::new(MemoryTransaction {
            backend: self,
            overlay: BTreeMap::new(),
        }))
    }

    fn namespaces(&self) -> Vec<String> {
        self.stores.read().keys().cloned().collect()
    }
}

/// A buffered transaction over a [`MemoryBackend`].
///
/// Writes accumulate in an overlay keyed by `(namespace, id)`; `None`
/// marks a deletion. Reads merge the overlay over the committed state.
struct MemoryTransaction<'a> {
    backend: &'a MemoryBackend,
    overlay: BTreeMap<(String, String), Option<Value>>,
}

impl MemoryTransaction<'_> {
    fn check_namespace(&self, namespace: &str) -> StorageResult<()> {
        if self.backend.stores.read().contains_key(namespace) {
            Ok(())
        } else {
            Err(StorageError::UnknownNamespace(namespace.into()))
        }
    }

    /// Returns the namespace contents with the overlay applied.
    fn merged(&self, namespace: &str) -> StorageResult<BTreeMap<String, Value>> {
        let stores = self.backend.stores.read();
        let mut merged = stores
            .get(namespace)
            .ok_or_else(|| StorageError::UnknownNamespace(namespace.into()))?
            .clone();
        for ((ns, id), value) in &self.overlay {
            if ns != namespace {
                continue;
            }
            match value {
                Some(v) => {
                    merged.insert(id.clone(), v.clone());
                }
                None => {
                    merged.remove(id);
                }
            }
        }
        Ok(merged)
    }
}

impl StorageTransaction for MemoryTransaction<'_> {
    fn get(&mut self, namespace: &str, id: &str) -> StorageResult<Option<Value>> {
        self.check_namespace(namespace)?;
        if let Some(value) = self.overlay.get(&(namespace.into(), id.into())) {
            return Ok(value.clone());
        }
        let stores = self.backend.stores.read();
        Ok(stores
            .get(namespace)
            .and_then(|store| store.get(id))
            .cloned())
    }

    fn get_all(&mut self, namespace: &str) -> StorageResult<Vec<(String, Value)>> {
        Ok(self.merged(namespace)?.into_iter().collect())
    }

    fn get_all_keys(&mut self, namespace: &str) -> StorageResult<Vec<String>> {
        Ok(self.merged(namespace)?.into_keys().collect())
    }

    fn put(&mut self, namespace: &str, id: &str, value: Value) -> StorageResult<()> {
        self.check_namespace(namespace)?;
        self.overlay.insert((namespace.into(), id.into()), Some(value));
        Ok(())
    }

    fn update(&mut self, namespace: &str, id: &str, value: Value) -> StorageResult<()> {
        // Replace-or-insert; see the trait docs for why a missing id is
        // not an error here.
        self.put(namespace, id, value)
    }

    fn delete(&mut self, namespace: &str, id: &str) -> StorageResult<()> {
        self.check_namespace(namespace)?;
        self.overlay.insert((namespace.into(), id.into()), None);
        Ok(())
    }

    fn commit(self: Box<Self>) -> StorageResult<()> {
        let mut stores = self.backend.stores.write();
        for ((ns, id), value) in self.overlay {
            let store = stores
                .get_mut(&ns)
                .ok_or_else(|| StorageError::UnknownNamespace(ns.clone()))?;
            match value {
                Some(v) => {
                    store.insert(id, v);
                }
                None => {
                    store.remove(&id);
                }
            }
        }
        Ok(())
    }
}
