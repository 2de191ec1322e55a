//! Reactive subscriptions with dependency tracking.

use crate::error::ClientResult;
use crate::tracked::TrackedTransaction;
use driftsync_protocol::{operations_to_dependencies, DependencyToken};
use driftsync_storage::StorageBackend;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

/// Handle returned by subscribe, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub(crate) type SubscriptionCallback =
    Box<dyn for<'a> FnMut(&mut TrackedTransaction<'a>) -> ClientResult<()> + Send>;

struct Subscription {
    callback: SubscriptionCallback,
    dependencies: HashSet<DependencyToken>,
}

/// Registry of active subscriptions keyed by id.
///
/// Each subscription remembers the dependency tokens of its last run.
/// When a write or patch touches an overlapping token the whole callback
/// reruns against a fresh read transaction, and its dependency set is
/// replaced by whatever the rerun read.
pub(crate) struct Subscriptions {
    next_id: u64,
    entries: BTreeMap<u64, Subscription>,
}

impl Subscriptions {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 1,
            entries: BTreeMap::new(),
        }
    }

    pub(crate) fn insert(
        &mut self,
        callback: SubscriptionCallback,
        dependencies: HashSet<DependencyToken>,
    ) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(
            id,
            Subscription {
                callback,
                dependencies,
            },
        );
        SubscriptionId(id)
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        self.entries.remove(&id.0).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Reruns every subscription whose dependencies overlap `changed`.
    ///
    /// A failing callback keeps its previous dependency set and does not
    /// fail the write that triggered the notification.
    pub(crate) fn notify(
        &mut self,
        backend: &dyn StorageBackend,
        changed: &HashSet<DependencyToken>,
    ) {
        if changed.is_empty() {
            return;
        }
        for (id, subscription) in self.entries.iter_mut() {
            if subscription.dependencies.is_disjoint(changed) {
                continue;
            }
            match run_callback(backend, &mut subscription.callback) {
                Ok(dependencies) => subscription.dependencies = dependencies,
                Err(error) => {
                    warn!(subscription = *id, %error, "subscription callback failed");
                }
            }
        }
    }
}

/// Runs a callback against a fresh read-only transaction and returns the
/// dependency tokens of what it read.
pub(crate) fn run_callback(
    backend: &dyn StorageBackend,
    callback: &mut SubscriptionCallback,
) -> ClientResult<HashSet<DependencyToken>> {
    let mut tracked = TrackedTransaction::new(backend.begin()?);
    callback(&mut tracked)?;
    // Never committed: subscription callbacks are reads, stray writes
    // are discarded with the transaction.
    let operations = tracked.into_operations();
    Ok(operations_to_dependencies(operations.iter()))
}
