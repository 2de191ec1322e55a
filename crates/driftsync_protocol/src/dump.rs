//! Diagnostic store snapshots.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A full snapshot of a store's contents plus its version.
///
/// Produced by the `dump()` diagnostics on both engines; used by tests to
/// assert that independent stores converged to identical state. Not part
/// of the sync protocol.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoreDump {
    /// The store's version: global version on the server, last synced
    /// version on a client.
    pub version: u64,
    /// Namespace contents, keyed by namespace then id.
    pub namespaces: BTreeMap<String, BTreeMap<String, Value>>,
}

impl StoreDump {
    /// Creates an empty dump at the given version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            namespaces: BTreeMap::new(),
        }
    }

    /// Inserts a namespace's contents.
    pub fn insert_namespace(
        &mut self,
        namespace: impl Into<String>,
        entities: impl IntoIterator<Item = (String, Value)>,
    ) {
        self.namespaces
            .insert(namespace.into(), entities.into_iter().collect());
    }

    /// Looks up an entity by namespace and id.
    pub fn get(&self, namespace: &str, id: &str) -> Option<&Value> {
        self.namespaces.get(namespace)?.get(id)
    }
}
