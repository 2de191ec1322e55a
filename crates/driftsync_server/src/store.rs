//! The authoritative server store.

use crate::error::{ServerError, ServerResult};
use driftsync_protocol::{Mutation, Operation, PullResponse, StoreDump};
use driftsync_storage::StorageBackend;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Version stamps for one object.
///
/// Retained after deletion: tombstones are what let `generate_patch` tell
/// a stale client that an object it has seen is gone.
#[derive(Debug, Clone)]
struct ObjectVersions {
    created_at: u64,
    updated_at: u64,
    deleted_at: Option<u64>,
}

/// Mutable reconciliation state, guarded by one mutex so a patch never
/// observes a half-applied mutation.
#[derive(Debug, Default)]
struct ServerState {
    /// Global version counter; +1 per applied mutation.
    version: u64,
    /// Last applied mutation id per client.
    last_mutation_by_client: HashMap<Uuid, u64>,
    /// Version stamps per `(namespace, id)`, including tombstones.
    objects: BTreeMap<(String, String), ObjectVersions>,
}

/// The single authoritative store.
///
/// Applies client mutations idempotently in arrival order (last write
/// wins at whole-object granularity), stamps per-object versions, and
/// produces catch-up patches for any client version.
pub struct ServerStore {
    backend: Arc<dyn StorageBackend>,
    state: Mutex<ServerState>,
}

impl ServerStore {
    /// Creates a server store over the given backend.
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(ServerState::default()),
        }
    }

    /// Returns the current global version.
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    /// Returns the last mutation id applied for a client (0 if unknown).
    pub fn last_mutation_id(&self, client_id: Uuid) -> u64 {
        self.state
            .lock()
            .last_mutation_by_client
            .get(&client_id)
            .copied()
            .unwrap_or(0)
    }

    /// Applies a batch of client mutations in order.
    ///
    /// Per mutation: ids at or below the client's recorded watermark are
    /// skipped (idempotent replay); an id that skips ahead is refused
    /// with [`ServerError::MutationGap`]. An accepted mutation bumps the
    /// global version by exactly one, applies its writes in one storage
    /// transaction, and stamps every touched object with the new version.
    pub fn apply_client_mutations(&self, mutations: &[Mutation]) -> ServerResult<()> {
        let mut state = self.state.lock();

        for mutation in mutations {
            let last = state
                .last_mutation_by_client
                .get(&mutation.client_id)
                .copied()
                .unwrap_or(0);

            if mutation.mutation_id <= last {
                debug!(
                    client_id = %mutation.client_id,
                    mutation_id = mutation.mutation_id,
                    "skipping already-applied mutation"
                );
                continue;
            }
            if mutation.mutation_id != last + 1 {
                return Err(ServerError::MutationGap {
                    client_id: mutation.client_id,
                    expected: last + 1,
                    got: mutation.mutation_id,
                });
            }

            let new_version = state.version + 1;
            let mut tx = self.backend.begin()?;

            for op in &mutation.operations {
                match op {
                    Operation::Put {
                        namespace,
                        id,
                        data,
                    } => {
                        tx.put(namespace, id, data.clone())?;
                        state.stamp_put(namespace, id, new_version);
                    }
                    Operation::Update {
                        namespace,
                        id,
                        data,
                        ..
                    } => {
                        tx.update(namespace, id, data.clone())?;
                        state.stamp_put(namespace, id, new_version);
                    }
                    Operation::Delete { namespace, id, .. } => {
                        tx.delete(namespace, id)?;
                        state.stamp_delete(namespace, id, new_version);
                    }
                    Operation::Get { .. }
                    | Operation::GetAll { .. }
                    | Operation::GetAllKeys { .. } => {}
                }
            }

            tx.commit()?;
            state.version = new_version;
            state
                .last_mutation_by_client
                .insert(mutation.client_id, mutation.mutation_id);
            debug!(
                client_id = %mutation.client_id,
                mutation_id = mutation.mutation_id,
                version = new_version,
                "applied mutation"
            );
        }

        Ok(())
    }

    /// Generates a catch-up patch for a client at `client_version`.
    ///
    /// Scans every object the server has ever stamped: objects deleted
    /// after `client_version` yield a delete, objects updated after it
    /// yield a put with the current value. Empty when the client is
    /// already current.
    ///
    /// This is a full scan by design; at larger data volumes an indexed
    /// changed-since structure would replace it.
    pub fn generate_patch(&self, client_version: u64, client_id: Uuid) -> ServerResult<PullResponse> {
        let state = self.state.lock();
        let mut patch = Vec::new();

        if client_version < state.version {
            let mut tx = self.backend.begin()?;
            for ((namespace, id), versions) in &state.objects {
                if let Some(deleted_at) = versions.deleted_at {
                    if deleted_at > client_version {
                        patch.push(Operation::Delete {
                            namespace: namespace.clone(),
                            id: id.clone(),
                            prev_data: None,
                        });
                    }
                } else if versions.updated_at > client_version {
                    let data = tx.get(namespace, id)?.ok_or_else(|| {
                        driftsync_storage::StorageError::Corrupted(format!(
                            "object {namespace}/{id} stamped live but missing"
                        ))
                    })?;
                    patch.push(Operation::Put {
                        namespace: namespace.clone(),
                        id: id.clone(),
                        data,
                    });
                }
            }
        }

        debug!(
            %client_id,
            client_version,
            db_version = state.version,
            patch_len = patch.len(),
            "generated patch"
        );

        Ok(PullResponse::new(
            client_id,
            patch,
            state
                .last_mutation_by_client
                .get(&client_id)
                .copied()
                .unwrap_or(0),
            state.version,
        ))
    }

    /// Returns a full snapshot of the store for diagnostics and tests.
    pub fn dump(&self) -> ServerResult<StoreDump> {
        let version = self.state.lock().version;
        let mut dump = StoreDump::new(version);
        let mut tx = self.backend.begin()?;
        for namespace in self.backend.namespaces() {
            let entities = tx.get_all(&namespace)?;
            dump.insert_namespace(namespace, entities);
        }
        Ok(dump)
    }
}

impl ServerState {
    fn stamp_put(&mut self, namespace: &str, id: &str, version: u64) {
        let key = (namespace.to_string(), id.to_string());
        match self.objects.get_mut(&key) {
            Some(versions) => {
                if versions.deleted_at.is_some() {
                    // Recreation: fresh creation stamp, tombstone cleared.
                    versions.created_at = version;
                    versions.deleted_at = None;
                }
                versions.updated_at = version;
            }
            None => {
                self.objects.insert(
                    key,
                    ObjectVersions {
                        created_at: version,
                        updated_at: version,
                        deleted_at: None,
                    },
                );
            }
        }
    }

    fn stamp_delete(&mut self, namespace: &str, id: &str, version: u64) {
        let key = (namespace.to_string(), id.to_string());
        match self.objects.get_mut(&key) {
            Some(versions) => {
                versions.updated_at = version;
                versions.deleted_at = Some(version);
            }
            None => {
                // Delete of an object the server never saw; keep the
                // tombstone so stale clients still hear about it.
                self.objects.insert(
                    key,
                    ObjectVersions {
                        created_at: version,
                        updated_at: version,
                        deleted_at: Some(version),
                    },
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftsync_storage::MemoryBackend;
    use serde_json::json;

    fn store() -> ServerStore {
        ServerStore::new(Arc::new(MemoryBackend::new(["nodes", "relations"])))
    }

    fn put_mutation(client_id: Uuid, mutation_id: u64, id: &str, data: serde_json::Value) -> Mutation {
        Mutation::new(
            client_id,
            mutation_id,
            vec![Operation::Put {
                namespace: "nodes".into(),
                id: id.into(),
                data,
            }],
        )
    }

    #[test]
    fn version_advances_once_per_mutation() {
        let store = store();
        let client = Uuid::new_v4();

        let mutation = Mutation::new(
            client,
            1,
            vec![
                Operation::Put {
                    namespace: "nodes".into(),
                    id: "1".into(),
                    data: json!(1),
                },
                Operation::Put {
                    namespace: "nodes".into(),
                    id: "2".into(),
                    data: json!(2),
                },
            ],
        );

        store.apply_client_mutations(&[mutation]).unwrap();
        assert_eq!(store.version(), 1);
        assert_eq!(store.last_mutation_id(client), 1);
    }

    #[test]
    fn replay_is_idempotent() {
        let store = store();
        let client = Uuid::new_v4();
        let mutations = vec![
            put_mutation(client, 1, "1", json!("a")),
            put_mutation(client, 2, "2", json!("b")),
        ];

        store.apply_client_mutations(&mutations).unwrap();
        let once = store.dump().unwrap();

        store.apply_client_mutations(&mutations).unwrap();
        let twice = store.dump().unwrap();

        assert_eq!(once, twice);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn mutation_gap_is_refused() {
        let store = store();
        let client = Uuid::new_v4();

        store
            .apply_client_mutations(&[put_mutation(client, 1, "1", json!(1))])
            .unwrap();

        let result = store.apply_client_mutations(&[put_mutation(client, 3, "3", json!(3))]);
        assert!(matches!(
            result,
            Err(ServerError::MutationGap {
                expected: 2,
                got: 3,
                ..
            })
        ));
        // The refused mutation must not have been applied.
        assert_eq!(store.version(), 1);
        assert!(store.dump().unwrap().get("nodes", "3").is_none());
    }

    #[test]
    fn first_mutation_must_be_one() {
        let store = store();
        let result =
            store.apply_client_mutations(&[put_mutation(Uuid::new_v4(), 2, "1", json!(1))]);
        assert!(matches!(result, Err(ServerError::MutationGap { .. })));
    }

    #[test]
    fn patch_empty_for_current_client() {
        let store = store();
        let client = Uuid::new_v4();
        store
            .apply_client_mutations(&[put_mutation(client, 1, "1", json!(1))])
            .unwrap();

        let response = store.generate_patch(1, client).unwrap();
        assert!(response.patch.is_empty());
        assert_eq!(response.db_version, 1);
        assert_eq!(response.last_mutation_id, 1);
    }

    #[test]
    fn patch_contains_changes_since_version() {
        let store = store();
        let client = Uuid::new_v4();

        store
            .apply_client_mutations(&[
                put_mutation(client, 1, "1", json!("a")),
                put_mutation(client, 2, "2", json!("b")),
            ])
            .unwrap();

        // A client that saw version 1 only needs "2".
        let response = store.generate_patch(1, Uuid::new_v4()).unwrap();
        assert_eq!(response.patch.len(), 1);
        assert!(matches!(
            &response.patch[0],
            Operation::Put { id, .. } if id == "2"
        ));
        assert_eq!(response.last_mutation_id, 0);
    }

    #[test]
    fn patch_delivers_deletes_to_stale_clients() {
        let store = store();
        let client = Uuid::new_v4();

        store
            .apply_client_mutations(&[put_mutation(client, 1, "1", json!("a"))])
            .unwrap();
        store
            .apply_client_mutations(&[Mutation::new(
                client,
                2,
                vec![Operation::Delete {
                    namespace: "nodes".into(),
                    id: "1".into(),
                    prev_data: Some(json!("a")),
                }],
            )])
            .unwrap();

        // A client that saw version 1 holds "1" and must hear the delete.
        let response = store.generate_patch(1, Uuid::new_v4()).unwrap();
        assert_eq!(response.patch.len(), 1);
        assert!(matches!(
            &response.patch[0],
            Operation::Delete { id, .. } if id == "1"
        ));

        // A fresh client never saw "1"; the tombstone delete is harmless.
        let response = store.generate_patch(0, Uuid::new_v4()).unwrap();
        assert!(response
            .patch
            .iter()
            .any(|op| matches!(op, Operation::Delete { id, .. } if id == "1")));
    }

    #[test]
    fn recreation_clears_tombstone() {
        let store = store();
        let client = Uuid::new_v4();

        store
            .apply_client_mutations(&[
                put_mutation(client, 1, "1", json!("a")),
                Mutation::new(
                    client,
                    2,
                    vec![Operation::Delete {
                        namespace: "nodes".into(),
                        id: "1".into(),
                        prev_data: Some(json!("a")),
                    }],
                ),
                put_mutation(client, 3, "1", json!("reborn")),
            ])
            .unwrap();

        let response = store.generate_patch(0, Uuid::new_v4()).unwrap();
        assert_eq!(response.patch.len(), 1);
        assert!(matches!(
            &response.patch[0],
            Operation::Put { id, data, .. } if id == "1" && *data == json!("reborn")
        ));
    }

    #[test]
    fn reads_in_mutations_are_ignored() {
        let store = store();
        let client = Uuid::new_v4();

        store
            .apply_client_mutations(&[Mutation::new(
                client,
                1,
                vec![Operation::GetAll {
                    namespace: "nodes".into(),
                }],
            )])
            .unwrap();

        // Still counts as an applied mutation.
        assert_eq!(store.version(), 1);
        assert_eq!(store.last_mutation_id(client), 1);
    }

    #[test]
    fn interleaved_clients_resolve_by_arrival_order() {
        let store = store();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        store
            .apply_client_mutations(&[put_mutation(alice, 1, "1", json!("alice"))])
            .unwrap();
        store
            .apply_client_mutations(&[put_mutation(bob, 1, "1", json!("bob"))])
            .unwrap();

        assert_eq!(store.dump().unwrap().get("nodes", "1"), Some(&json!("bob")));
        assert_eq!(store.version(), 2);
    }
}
