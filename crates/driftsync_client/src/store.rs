//! The local-first client store.

use crate::config::SyncConfig;
use crate::error::{ClientError, ClientResult};
use crate::log::MutationLog;
use crate::subscription::{self, SubscriptionCallback, SubscriptionId, Subscriptions};
use crate::tracked::TrackedTransaction;
use crate::transport::SyncTransport;
use driftsync_protocol::{
    operations_to_dependencies, reverse_operations, Mutation, Operation, PullRequest, PushRequest,
    StoreDump,
};
use driftsync_storage::{StorageBackend, StorageError, StorageTransaction};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// A local replica with an unconfirmed mutation log and reactive
/// subscriptions.
///
/// Reads and writes hit local storage immediately. Writes are queued as
/// [`Mutation`]s and confirmed by [`push`](Self::push) and
/// [`pull`](Self::pull); a pull rebases the local store by undoing
/// unconfirmed writes, applying the server patch, and replaying whatever
/// the server has not yet applied, all in one storage commit.
pub struct ClientStore {
    client_id: Uuid,
    config: SyncConfig,
    backend: Arc<dyn StorageBackend>,
    transport: Option<Arc<dyn SyncTransport>>,
    log: Mutex<MutationLog>,
    subscriptions: Mutex<Subscriptions>,
    /// Serializes mutate and pull, so a rebase never interleaves with a
    /// local write.
    write_lock: Mutex<()>,
}

impl ClientStore {
    /// Creates a store over the given backend, with a fresh client id and
    /// no transport.
    pub fn new(backend: Arc<dyn StorageBackend>, config: SyncConfig) -> Self {
        let client_id = Uuid::new_v4();
        info!(%client_id, server_url = %config.server_url, "client store created");
        Self {
            client_id,
            config,
            backend,
            transport: None,
            log: Mutex::new(MutationLog::new()),
            subscriptions: Mutex::new(Subscriptions::new()),
            write_lock: Mutex::new(()),
        }
    }

    /// Sets the transport used by push and pull.
    pub fn with_transport(mut self, transport: Arc<dyn SyncTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// This client's id.
    pub fn client_id(&self) -> Uuid {
        self.client_id
    }

    /// Number of unconfirmed mutations in the log.
    pub fn pending_mutations(&self) -> usize {
        self.log.lock().pending_count()
    }

    /// The server version as of the last successful pull.
    pub fn last_sync_version(&self) -> u64 {
        self.log.lock().last_sync_version()
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Runs a write callback in a single local transaction.
    ///
    /// On success the transaction commits, the recorded operations become
    /// the next mutation in the log, and affected subscriptions rerun.
    /// On error nothing is committed and no mutation is recorded.
    pub fn mutate<F>(&self, f: F) -> ClientResult<Mutation>
    where
        F: FnOnce(&mut TrackedTransaction<'_>) -> ClientResult<()>,
    {
        let _guard = self.write_lock.lock();

        let mut tracked = TrackedTransaction::new(self.backend.begin()?);
        f(&mut tracked)?;
        let operations = tracked.finish()?;

        let mutation = self.log.lock().record(self.client_id, operations);
        debug!(
            mutation_id = mutation.mutation_id,
            operations = mutation.operations.len(),
            "mutation recorded"
        );

        let changed = operations_to_dependencies(mutation.writes());
        self.subscriptions
            .lock()
            .notify(self.backend.as_ref(), &changed);
        Ok(mutation)
    }

    /// Runs a read callback against the current local state.
    ///
    /// The transaction is never committed; stray writes are discarded.
    pub fn query<T, F>(&self, f: F) -> ClientResult<T>
    where
        F: FnOnce(&mut TrackedTransaction<'_>) -> ClientResult<T>,
    {
        let mut tracked = TrackedTransaction::new(self.backend.begin()?);
        f(&mut tracked)
    }

    /// Registers a callback that reruns whenever data it read changes.
    ///
    /// The callback runs once immediately; if that run fails the
    /// subscription is not registered and the error propagates.
    pub fn subscribe<F>(&self, callback: F) -> ClientResult<SubscriptionId>
    where
        F: for<'a> FnMut(&mut TrackedTransaction<'a>) -> ClientResult<()> + Send + 'static,
    {
        let mut callback: SubscriptionCallback = Box::new(callback);
        let dependencies = subscription::run_callback(self.backend.as_ref(), &mut callback)?;
        Ok(self.subscriptions.lock().insert(callback, dependencies))
    }

    /// Removes a subscription. Returns false if the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.lock().remove(id)
    }

    /// Pushes the entire unconfirmed queue to the server.
    ///
    /// Safe to repeat: the server dedups by mutation id. A refusal (such
    /// as a mutation id gap) surfaces as [`ClientError::Rejected`].
    pub fn push(&self) -> ClientResult<()> {
        let transport = self.transport()?;
        let mutations: Vec<Mutation> = self.log.lock().unconfirmed().cloned().collect();
        if mutations.is_empty() {
            return Ok(());
        }

        let count = mutations.len();
        let response = transport.push(&PushRequest::new(mutations))?;
        if !response.success {
            return Err(ClientError::Rejected(
                response.error.unwrap_or_else(|| "unspecified".into()),
            ));
        }
        debug!(mutations = count, "push accepted");
        Ok(())
    }

    /// Pulls a patch from the server and rebases the local store.
    ///
    /// The rebase undoes every logged operation, applies the server
    /// patch, and replays the mutations the server has not applied yet,
    /// all within one storage transaction. Local writes are blocked for
    /// the duration, including the network round trip.
    pub fn pull(&self) -> ClientResult<()> {
        let transport = self.transport()?;
        let _guard = self.write_lock.lock();

        let request = PullRequest::new(self.client_id, self.log.lock().last_sync_version());
        let response = transport.pull(&request)?;
        if response.client_id != self.client_id {
            return Err(ClientError::Protocol(format!(
                "pull response for client {}, expected {}",
                response.client_id, self.client_id
            )));
        }

        let mut log = self.log.lock();
        let undo = reverse_operations(&log.all_operations());
        let replay = log.operations_after(response.last_mutation_id);

        let mut tx = self.backend.begin()?;
        for operation in undo.iter().chain(&response.patch).chain(&replay) {
            apply_operation(tx.as_mut(), operation)?;
        }
        tx.commit()?;

        log.drop_confirmed(response.last_mutation_id);
        log.set_last_sync_version(response.db_version);
        let pending = log.pending_count();
        drop(log);

        debug!(
            patch = response.patch.len(),
            db_version = response.db_version,
            pending,
            "pull applied"
        );

        let changed = operations_to_dependencies(
            undo.iter()
                .chain(&response.patch)
                .chain(&replay)
                .filter(|op| op.is_write()),
        );
        self.subscriptions
            .lock()
            .notify(self.backend.as_ref(), &changed);
        Ok(())
    }

    /// Push with retry on retryable transport errors.
    pub fn push_with_retry(&self) -> ClientResult<()> {
        self.with_retry("push", || self.push())
    }

    /// Pull with retry on retryable transport errors.
    pub fn pull_with_retry(&self) -> ClientResult<()> {
        self.with_retry("pull", || self.pull())
    }

    /// Pushes then pulls, with retries.
    pub fn sync(&self) -> ClientResult<()> {
        self.push_with_retry()?;
        self.pull_with_retry()
    }

    /// Snapshot of the local store for diagnostics and convergence checks.
    pub fn dump(&self) -> ClientResult<StoreDump> {
        let mut dump = StoreDump::new(self.log.lock().last_sync_version());
        let mut tx = self.backend.begin()?;
        for namespace in self.backend.namespaces() {
            let entities = tx.get_all(&namespace)?;
            dump.insert_namespace(namespace, entities);
        }
        Ok(dump)
    }

    fn transport(&self) -> ClientResult<&Arc<dyn SyncTransport>> {
        self.transport.as_ref().ok_or(ClientError::NoTransport)
    }

    fn with_retry(&self, what: &str, f: impl Fn() -> ClientResult<()>) -> ClientResult<()> {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            match f() {
                Ok(()) => return Ok(()),
                Err(error) if error.is_retryable() && attempt + 1 < retry.max_attempts => {
                    attempt += 1;
                    let delay = retry.delay_for_attempt(attempt);
                    debug!(%error, attempt, ?delay, what, "retrying after transport error");
                    std::thread::sleep(delay);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn apply_operation(tx: &mut dyn StorageTransaction, operation: &Operation) -> ClientResult<()> {
    let result = match operation {
        Operation::Put {
            namespace,
            id,
            data,
        } => tx.put(namespace, id, data.clone()),
        Operation::Update {
            namespace,
            id,
            data,
            ..
        } => tx.update(namespace, id, data.clone()),
        Operation::Delete { namespace, id, .. } => tx.delete(namespace, id),
        Operation::Get { .. } | Operation::GetAll { .. } | Operation::GetAllKeys { .. } => Ok(()),
    };
    result.map_err(|error| match error {
        // A patch naming a namespace this store was not built with is
        // sync-state corruption, not a storage fault.
        StorageError::UnknownNamespace(namespace) => ClientError::Protocol(format!(
            "operation references unknown namespace {namespace}"
        )),
        other => ClientError::Storage(other),
    })
}
