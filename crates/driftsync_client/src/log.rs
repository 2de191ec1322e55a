//! The client's ordered log of unconfirmed mutations.

use driftsync_protocol::{Mutation, Operation};
use std::collections::VecDeque;
use uuid::Uuid;

/// Unconfirmed mutations plus the sync cursor state.
///
/// Mutation ids are dense per client, starting at 1. The log holds every
/// mutation not yet confirmed by a pull; push re-sends the whole queue
/// and relies on server-side dedup.
#[derive(Debug)]
pub(crate) struct MutationLog {
    next_mutation_id: u64,
    last_sync_version: u64,
    unconfirmed: VecDeque<Mutation>,
}

impl MutationLog {
    pub(crate) fn new() -> Self {
        Self {
            next_mutation_id: 1,
            last_sync_version: 0,
            unconfirmed: VecDeque::new(),
        }
    }

    /// Assigns the next mutation id and appends to the queue.
    pub(crate) fn record(&mut self, client_id: Uuid, operations: Vec<Operation>) -> Mutation {
        let mutation = Mutation::new(client_id, self.next_mutation_id, operations);
        self.next_mutation_id += 1;
        self.unconfirmed.push_back(mutation.clone());
        mutation
    }

    /// The unconfirmed mutations, oldest first.
    pub(crate) fn unconfirmed(&self) -> impl Iterator<Item = &Mutation> {
        self.unconfirmed.iter()
    }

    /// All logged operations flattened in log order.
    pub(crate) fn all_operations(&self) -> Vec<Operation> {
        self.unconfirmed
            .iter()
            .flat_map(|m| m.operations.iter().cloned())
            .collect()
    }

    /// Operations of mutations the server has not applied yet, i.e. with
    /// an id greater than `last_applied`.
    pub(crate) fn operations_after(&self, last_applied: u64) -> Vec<Operation> {
        self.unconfirmed
            .iter()
            .filter(|m| m.mutation_id > last_applied)
            .flat_map(|m| m.operations.iter().cloned())
            .collect()
    }

    /// Drops mutations confirmed by the server (id at most `last_applied`).
    pub(crate) fn drop_confirmed(&mut self, last_applied: u64) {
        while self
            .unconfirmed
            .front()
            .is_some_and(|m| m.mutation_id <= last_applied)
        {
            self.unconfirmed.pop_front();
        }
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.unconfirmed.len()
    }

    pub(crate) fn last_sync_version(&self) -> u64 {
        self.last_sync_version
    }

    pub(crate) fn set_last_sync_version(&mut self, version: u64) {
        self.last_sync_version = version;
    }
}
