//! Sync engine: local-first persistence of one aggregate kind for one owner.
//!
//! # Responsibility
//! - Apply edits to the in-memory state store and debounce their flush.
//! - Run explicit save and delete actions against cache and remote.
//! - Reconcile temporary ids once the remote authority issues durable ones.
//! - Forward identity and deletion events to linked engines.
//!
//! # Invariants
//! - The collection lock is never held across an await.
//! - An explicit action cancels the pending automatic flush of the same
//!   aggregate before doing anything else.
//! - Remote writes of one aggregate run one at a time, so a temporary id is
//!   created remotely at most once.
//! - Automatic flushes never surface errors; explicit actions do, except a
//!   transient network failure, which reports `SaveOutcome::SavedLocally`.
//! - Status only advances after the remote authority accepted the write.
//! - Collection engines must `restore` before the first `create`, or the
//!   next local write replaces the cached collection.

use crate::cache::{KeyValueStore, MemoryKeyValueStore, NamespacedCache, SqliteKeyValueStore};
use crate::config::{EngineConfig, KindPolicies, KindPolicy};
use crate::error::{SyncError, SyncResult};
use crate::model::aggregate::{Aggregate, AggregateKind, OwnerScoped};
use crate::model::identifier::AggregateId;
use crate::model::session::SessionIdentity;
use crate::model::status::{SaveAction, WorkflowStatus};
use crate::remote::{HttpTransport, RemoteClient, RemoteError, RemoteResult, RemoteTransport};
use crate::sync::lifecycle::plan_action;
use crate::sync::loader::{ColdStartLoader, LoadSource};
use crate::sync::reconcile::{IdentityReconciler, ReconcileOutcome, ReferenceRewriter, Rekey};
use crate::sync::scheduler::DebounceTimer;
use crate::sync::state::{FlushTicket, StateStore, SyncState};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::runtime::Handle;
use tokio::sync::Mutex as AsyncMutex;

/// Dependencies shared by every engine of one signed-in session.
#[derive(Clone)]
pub struct SyncContext {
    session: SessionIdentity,
    cache: NamespacedCache,
    remote: RemoteClient,
    policies: KindPolicies,
    runtime: Handle,
}

impl SyncContext {
    pub fn new(
        session: SessionIdentity,
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn RemoteTransport>,
        policies: KindPolicies,
        runtime: Handle,
    ) -> Self {
        let cache = NamespacedCache::new(store, session.user_id.clone());
        Self {
            session,
            cache,
            remote: RemoteClient::new(transport),
            policies,
            runtime,
        }
    }

    /// Builds the production stack: SQLite (or in-memory) cache and HTTP
    /// transport, as described by `config`.
    pub fn from_config(
        config: &EngineConfig,
        session: SessionIdentity,
        runtime: Handle,
    ) -> SyncResult<Self> {
        let store: Arc<dyn KeyValueStore> = match config.cache_path.as_ref() {
            Some(path) => Arc::new(SqliteKeyValueStore::open(path, config.cache_quota_bytes)?),
            None => Arc::new(match config.cache_quota_bytes {
                Some(quota) => MemoryKeyValueStore::with_quota(quota),
                None => MemoryKeyValueStore::new(),
            }),
        };
        let transport = Arc::new(HttpTransport::new(&config.remote)?);
        info!(
            "event=sync_context_init module=sync status=ok owner={} cache={}",
            session.user_id,
            if config.cache_path.is_some() { "sqlite" } else { "memory" }
        );
        Ok(Self::new(
            session,
            store,
            transport,
            config.kinds.clone(),
            runtime,
        ))
    }

    pub fn session(&self) -> &SessionIdentity {
        &self.session
    }

    pub fn cache(&self) -> &NamespacedCache {
        &self.cache
    }

    pub fn remote(&self) -> &RemoteClient {
        &self.remote
    }

    pub fn engine<A: Aggregate>(&self) -> SyncEngine<A> {
        SyncEngine::new(self)
    }
}

/// Result of an explicit save that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Remote authority accepted the write.
    Synced {
        id: AggregateId,
        status: Option<WorkflowStatus>,
    },
    /// Authority unreachable. The value is kept locally and stays unsynced;
    /// status is unchanged.
    SavedLocally {
        id: AggregateId,
        reason: RemoteError,
    },
}

impl SaveOutcome {
    pub fn id(&self) -> &AggregateId {
        match self {
            Self::Synced { id, .. } | Self::SavedLocally { id, .. } => id,
        }
    }

    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Synced { .. })
    }
}

pub(super) struct Slot<A: Aggregate> {
    pub(super) store: StateStore<A>,
    pub(super) timer: DebounceTimer,
    /// Held for the whole of one flush or explicit action.
    pub(super) writer: Arc<AsyncMutex<()>>,
}

impl<A: Aggregate> Slot<A> {
    fn new(store: StateStore<A>) -> Self {
        Self {
            store,
            timer: DebounceTimer::new(),
            writer: Arc::new(AsyncMutex::new(())),
        }
    }
}

impl<A: Aggregate> Rekey for Slot<A> {
    fn replace_identifier(&mut self, old: &AggregateId, new: &AggregateId) -> bool {
        self.store.replace_identifier(old, new)
    }

    fn rewrite_reference(
        &mut self,
        kind: AggregateKind,
        old: &AggregateId,
        new: &AggregateId,
    ) -> bool {
        self.store.rewrite_reference(kind, old, new)
    }
}

pub(super) struct Collection<A: Aggregate> {
    pub(super) slots: BTreeMap<AggregateId, Slot<A>>,
    pub(super) reconciler: IdentityReconciler,
}

impl<A: Aggregate> Collection<A> {
    fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
            reconciler: IdentityReconciler::new(),
        }
    }

    pub(super) fn snapshot_all(&self) -> Vec<A> {
        self.slots.values().map(|slot| slot.store.snapshot()).collect()
    }

    /// Resolves `id` through recorded mappings and returns its slot.
    pub(super) fn slot_mut(&mut self, id: &AggregateId) -> SyncResult<(AggregateId, &mut Slot<A>)> {
        let id = self.reconciler.resolve(id);
        match self.slots.get_mut(&id) {
            Some(slot) => Ok((id, slot)),
            None => Err(SyncError::UnknownAggregate(id)),
        }
    }
}

/// Successful remote write after local bookkeeping.
struct Settled {
    id: AggregateId,
    status: Option<WorkflowStatus>,
    reconciled_from: Option<AggregateId>,
}

pub(super) struct EngineInner<A: Aggregate> {
    pub(super) policy: KindPolicy,
    pub(super) cache: NamespacedCache,
    pub(super) remote: RemoteClient,
    session: SessionIdentity,
    runtime: Handle,
    collection: Mutex<Collection<A>>,
    linked: Mutex<Vec<Weak<dyn ReferenceRewriter>>>,
}

impl<A: Aggregate> EngineInner<A> {
    pub(super) fn lock(&self) -> MutexGuard<'_, Collection<A>> {
        self.collection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Writes the whole collection to the local cache. Failures are logged.
    pub(super) fn persist_locally(&self, entries: &[A]) -> bool {
        match self.cache.write_record(entries) {
            Ok(()) => {
                debug!(
                    "event=local_flush module=sync status=ok kind={} entries={}",
                    A::KIND,
                    entries.len()
                );
                true
            }
            Err(err) => {
                warn!(
                    "event=local_flush module=sync status=error kind={} error={err}",
                    A::KIND
                );
                false
            }
        }
    }

    /// (Re)starts the quiet period of one aggregate.
    pub(super) fn schedule(self: &Arc<Self>, slot: &mut Slot<A>, id: AggregateId) {
        let engine = Arc::downgrade(self);
        slot.timer
            .arm(&self.runtime, self.policy.quiet_period(), async move {
                if let Some(engine) = engine.upgrade() {
                    engine.autosave(id).await;
                }
            });
    }

    /// Cancels pending and started flushes of `id` and returns its writer
    /// lock, to be awaited outside the collection lock.
    pub(super) fn claim_writer(&self, id: &AggregateId) -> SyncResult<Arc<AsyncMutex<()>>> {
        let mut collection = self.lock();
        let (_, slot) = collection.slot_mut(id)?;
        slot.timer.cancel();
        slot.store.abandon_flush();
        Ok(Arc::clone(&slot.writer))
    }

    fn check_parent(candidate: &A) -> SyncResult<()> {
        if !A::REQUIRES_PARENT {
            return Ok(());
        }
        match candidate.parent_reference() {
            Some(parent) if parent.is_durable() => Ok(()),
            _ => Err(SyncError::MissingParentReference {
                kind: A::KIND,
                id: candidate.id().clone(),
            }),
        }
    }

    /// Sends `candidate` as a create or an update depending on its identity.
    async fn push(&self, id: &AggregateId, candidate: &A) -> RemoteResult<A> {
        if A::OWNER_KEYED {
            return self.remote.update(self.cache.owner_id(), candidate).await;
        }
        match id.as_durable() {
            Some(key) => self.remote.update(key, candidate).await,
            None => self.remote.create(candidate).await,
        }
    }

    async fn autosave(self: Arc<Self>, id: AggregateId) {
        let writer = {
            let mut collection = self.lock();
            match collection.slot_mut(&id) {
                Ok((_, slot)) => Arc::clone(&slot.writer),
                Err(_) => return,
            }
        };
        let _turn = writer.lock().await;

        let (id, candidate, ticket, local_ok) = {
            let mut collection = self.lock();
            let entries = collection.snapshot_all();
            let Ok((id, slot)) = collection.slot_mut(&id) else {
                return;
            };
            let ticket = slot.store.begin_flush();
            let candidate = slot.store.snapshot();
            let local_ok = self.persist_locally(&entries);
            if !self.policy.autosaves_remotely() {
                let state = slot.store.finish_flush(ticket, local_ok);
                debug!(
                    "event=autosave module=sync status=ok kind={} id={id} target=local state={}",
                    A::KIND,
                    state.as_str()
                );
                return;
            }
            (id, candidate, ticket, local_ok)
        };

        if let Err(err) = Self::check_parent(&candidate) {
            debug!(
                "event=autosave module=sync status=skipped kind={} id={id} reason={err}",
                A::KIND
            );
            self.settle_failure(&id, ticket);
            return;
        }

        match self.push(&id, &candidate).await {
            Ok(stored) => match self.settle_success(&id, &stored, ticket, None) {
                Ok(settled) => {
                    self.announce(&settled);
                    debug!(
                        "event=autosave module=sync status=ok kind={} id={} target=remote local={local_ok}",
                        A::KIND,
                        settled.id
                    );
                }
                Err(err) => warn!(
                    "event=autosave module=sync status=settle_failed kind={} id={id} error={err}",
                    A::KIND
                ),
            },
            Err(err) => {
                self.settle_failure(&id, ticket);
                if err.is_transient() {
                    info!(
                        "event=autosave module=sync status=offline kind={} id={id} error={err}",
                        A::KIND
                    );
                } else {
                    warn!(
                        "event=autosave module=sync status=remote_failed kind={} id={id} error={err}",
                        A::KIND
                    );
                }
            }
        }
    }

    /// Records a successful remote write: reconciles a create, commits the
    /// requested status and refreshes the local copy.
    fn settle_success(
        &self,
        sent_id: &AggregateId,
        stored: &A,
        ticket: FlushTicket,
        target: Option<WorkflowStatus>,
    ) -> SyncResult<Settled> {
        let mut collection = self.lock();
        let mut id = collection.reconciler.resolve(sent_id);
        let mut reconciled_from = None;

        if id.is_temporary() && !A::OWNER_KEYED {
            let durable = stored.id().clone();
            let Collection { slots, reconciler } = &mut *collection;
            match reconciler.reconcile(A::KIND, slots, &id, &durable) {
                Ok(ReconcileOutcome::Applied) => reconciled_from = Some(id.clone()),
                Ok(ReconcileOutcome::AlreadyApplied) => {}
                Err(err) => {
                    if let Some(slot) = slots.get_mut(&id) {
                        slot.store.finish_flush(ticket, false);
                    }
                    warn!(
                        "event=identity_reconcile module=sync status=error kind={} id={id} durable={durable} error={err}",
                        A::KIND
                    );
                    return Err(err.into());
                }
            }
            id = durable;
        }

        let Some(slot) = collection.slots.get_mut(&id) else {
            return Err(SyncError::UnknownAggregate(id));
        };
        let previous_status = slot.store.current().status();
        let status = match target {
            Some(target) => slot.store.advance_status(target),
            None => previous_status,
        };
        slot.store.finish_flush(ticket, true);

        // The pre-flush local write already holds everything else.
        if reconciled_from.is_some() || status != previous_status {
            let entries = collection.snapshot_all();
            self.persist_locally(&entries);
        }
        Ok(Settled {
            id,
            status,
            reconciled_from,
        })
    }

    fn settle_failure(&self, sent_id: &AggregateId, ticket: FlushTicket) -> AggregateId {
        let mut collection = self.lock();
        let id = collection.reconciler.resolve(sent_id);
        if let Some(slot) = collection.slots.get_mut(&id) {
            slot.store.finish_flush(ticket, false);
        }
        id
    }

    fn announce(&self, settled: &Settled) {
        if let Some(temporary) = settled.reconciled_from.as_ref() {
            for rewriter in self.linked_rewriters() {
                rewriter.rewrite_reference(A::KIND, temporary, &settled.id);
            }
        }
    }

    fn linked_rewriters(&self) -> Vec<Arc<dyn ReferenceRewriter>> {
        self.linked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

impl<A: Aggregate> ReferenceRewriter for EngineInner<A> {
    fn rewrite_reference(&self, kind: AggregateKind, old: &AggregateId, new: &AggregateId) {
        let mut collection = self.lock();
        let mut changed = 0usize;
        for slot in collection.slots.values_mut() {
            if slot.store.rewrite_reference(kind, old, new) {
                changed += 1;
            }
        }
        if changed > 0 {
            let entries = collection.snapshot_all();
            self.persist_locally(&entries);
            debug!(
                "event=reference_rewrite module=sync status=ok kind={} target={kind} old={old} new={new} changed={changed}",
                A::KIND
            );
        }
    }

    fn drop_reference(&self, kind: AggregateKind, id: &AggregateId) {
        let mut collection = self.lock();
        let mut changed = 0usize;
        for slot in collection.slots.values_mut() {
            if slot.store.drop_reference(kind, id) {
                changed += 1;
            }
        }
        if changed > 0 {
            let entries = collection.snapshot_all();
            self.persist_locally(&entries);
            debug!(
                "event=reference_drop module=sync status=ok kind={} target={kind} id={id} changed={changed}",
                A::KIND
            );
        }
    }
}

/// Local-first engine for aggregates of kind `A`. Cloning shares state.
pub struct SyncEngine<A: Aggregate> {
    pub(super) inner: Arc<EngineInner<A>>,
}

impl<A: Aggregate> Clone for SyncEngine<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Aggregate> SyncEngine<A> {
    pub fn new(context: &SyncContext) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                policy: context.policies.for_kind(A::KIND),
                cache: context.cache.clone(),
                remote: context.remote.clone(),
                session: context.session.clone(),
                runtime: context.runtime.clone(),
                collection: Mutex::new(Collection::new()),
                linked: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn kind(&self) -> AggregateKind {
        A::KIND
    }

    pub fn policy(&self) -> KindPolicy {
        self.inner.policy
    }

    pub fn owner_id(&self) -> &str {
        self.inner.cache.owner_id()
    }

    /// Forwards this engine's identity and deletion events to `other`.
    pub fn link<B: Aggregate>(&self, other: &SyncEngine<B>) {
        let target: Weak<EngineInner<B>> = Arc::downgrade(&other.inner);
        let target: Weak<dyn ReferenceRewriter> = target;
        self.inner
            .linked
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(target);
    }

    /// Loads the cached collection. Entries already held are kept.
    pub fn restore(&self) -> SyncResult<usize> {
        let entries = self
            .inner
            .cache
            .read_record::<A>()?
            .map(|record| record.entries)
            .unwrap_or_default();

        let mut collection = self.inner.lock();
        let mut restored = 0usize;
        for aggregate in entries {
            let id = aggregate.id().clone();
            if !collection.slots.contains_key(&id) {
                collection
                    .slots
                    .insert(id, Slot::new(StateStore::clean(aggregate)));
                restored += 1;
            }
        }
        info!(
            "event=collection_restore module=sync status=ok kind={} restored={restored}",
            A::KIND
        );
        Ok(restored)
    }

    /// Adds a new, never-saved aggregate and writes it locally.
    pub fn create(&self, aggregate: A) -> SyncResult<AggregateId> {
        let id = aggregate.id().clone();
        let mut collection = self.inner.lock();
        if collection.slots.contains_key(&id) {
            return Err(SyncError::DuplicateAggregate(id));
        }
        collection
            .slots
            .insert(id.clone(), Slot::new(StateStore::unsaved(aggregate)));
        let entries = collection.snapshot_all();
        self.inner.persist_locally(&entries);
        info!("event=aggregate_create module=sync status=ok kind={} id={id}", A::KIND);
        Ok(id)
    }

    /// Current identifier for `id`, following any reconciliation.
    pub fn resolve(&self, id: &AggregateId) -> AggregateId {
        self.inner.lock().reconciler.resolve(id)
    }

    pub fn get(&self, id: &AggregateId) -> Option<A> {
        let collection = self.inner.lock();
        let id = collection.reconciler.resolve(id);
        collection.slots.get(&id).map(|slot| slot.store.snapshot())
    }

    pub fn sync_state(&self, id: &AggregateId) -> Option<SyncState> {
        let collection = self.inner.lock();
        let id = collection.reconciler.resolve(id);
        collection.slots.get(&id).map(|slot| slot.store.sync_state())
    }

    pub fn ids(&self) -> Vec<AggregateId> {
        self.inner.lock().slots.keys().cloned().collect()
    }

    pub fn snapshot_all(&self) -> Vec<A> {
        self.inner.lock().snapshot_all()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies one edit and restarts the aggregate's quiet period.
    pub fn apply(&self, id: &AggregateId, patch: A::Patch) -> SyncResult<()> {
        let mut collection = self.inner.lock();
        let (id, slot) = collection.slot_mut(id)?;
        slot.store.apply(patch);
        self.inner.schedule(slot, id);
        Ok(())
    }

    /// Explicit save. Persists locally, gates the requested status, then
    /// writes to the remote authority.
    pub async fn save(&self, id: &AggregateId, action: SaveAction) -> SyncResult<SaveOutcome> {
        let inner = &self.inner;
        let writer = inner.claim_writer(id)?;
        let _turn = writer.lock().await;

        let (id, candidate, ticket, target) = {
            let mut collection = inner.lock();
            let entries = collection.snapshot_all();
            let (id, slot) = collection.slot_mut(id)?;
            slot.timer.cancel();
            slot.store.abandon_flush();
            inner.persist_locally(&entries);

            let mut candidate = slot.store.snapshot();
            let target = plan_action(&candidate, action).map_err(|err| {
                info!(
                    "event=explicit_save module=sync status=refused kind={} id={id} action={} error={err}",
                    A::KIND,
                    action.as_str()
                );
                err
            })?;
            EngineInner::<A>::check_parent(&candidate)?;
            if let Some(target) = target {
                candidate.set_status(target);
            }
            (id, candidate, slot.store.begin_flush(), target)
        };

        match inner.push(&id, &candidate).await {
            Ok(stored) => {
                let settled = inner.settle_success(&id, &stored, ticket, target)?;
                inner.announce(&settled);
                info!(
                    "event=explicit_save module=sync status=ok kind={} id={} action={}",
                    A::KIND,
                    settled.id,
                    action.as_str()
                );
                Ok(SaveOutcome::Synced {
                    id: settled.id,
                    status: settled.status,
                })
            }
            Err(err) if err.is_transient() => {
                let id = inner.settle_failure(&id, ticket);
                info!(
                    "event=explicit_save module=sync status=saved_locally kind={} id={id} action={} error={err}",
                    A::KIND,
                    action.as_str()
                );
                Ok(SaveOutcome::SavedLocally { id, reason: err })
            }
            Err(err) => {
                let id = inner.settle_failure(&id, ticket);
                warn!(
                    "event=explicit_save module=sync status=error kind={} id={id} action={} error={err}",
                    A::KIND,
                    action.as_str()
                );
                Err(SyncError::Remote(err))
            }
        }
    }

    /// Explicit delete from the remote authority, the local cache and
    /// memory. Linked engines drop their references.
    pub async fn delete(&self, id: &AggregateId) -> SyncResult<()> {
        let inner = &self.inner;
        let writer = inner.claim_writer(id)?;
        let _turn = writer.lock().await;
        let id = inner.lock().reconciler.resolve(id);

        let remote_key = if A::OWNER_KEYED {
            Some(inner.cache.owner_id().to_string())
        } else {
            id.as_durable().map(str::to_string)
        };
        if let Some(key) = remote_key {
            match inner.remote.delete(A::KIND, &key).await {
                Ok(()) => {}
                Err(RemoteError::Status { status: 404, .. }) => debug!(
                    "event=aggregate_delete module=sync status=already_gone kind={} id={id}",
                    A::KIND
                ),
                Err(err) => {
                    warn!(
                        "event=aggregate_delete module=sync status=error kind={} id={id} error={err}",
                        A::KIND
                    );
                    return Err(SyncError::Remote(err));
                }
            }
        }

        let id = {
            let mut collection = inner.lock();
            let id = collection.reconciler.resolve(&id);
            collection.slots.remove(&id);
            let entries = collection.snapshot_all();
            inner.persist_locally(&entries);
            id
        };
        for rewriter in inner.linked_rewriters() {
            rewriter.drop_reference(A::KIND, &id);
        }
        info!("event=aggregate_delete module=sync status=ok kind={} id={id}", A::KIND);
        Ok(())
    }

    /// Records `temporary → durable` and rewrites every reference to it.
    pub fn reconcile(
        &self,
        temporary: &AggregateId,
        durable: &AggregateId,
    ) -> SyncResult<ReconcileOutcome> {
        let outcome = {
            let mut collection = self.inner.lock();
            let Collection { slots, reconciler } = &mut *collection;
            let outcome = reconciler.reconcile(A::KIND, slots, temporary, durable)?;
            if outcome == ReconcileOutcome::Applied {
                let entries = collection.snapshot_all();
                self.inner.persist_locally(&entries);
            }
            outcome
        };
        if outcome == ReconcileOutcome::Applied {
            self.inner.announce(&Settled {
                id: durable.clone(),
                status: None,
                reconciled_from: Some(temporary.clone()),
            });
        }
        Ok(outcome)
    }

    /// Navigation away: cancels pending flushes and writes every unsynced
    /// change to the local cache. Returns whether a write happened.
    pub fn close(&self) -> bool {
        let mut collection = self.inner.lock();
        let mut unsynced = 0usize;
        for slot in collection.slots.values_mut() {
            slot.timer.cancel();
            slot.store.abandon_flush();
            if slot.store.sync_state().has_unsynced_changes() {
                unsynced += 1;
            }
        }
        if unsynced == 0 {
            return false;
        }

        let entries = collection.snapshot_all();
        let written = self.inner.persist_locally(&entries);
        if written && !self.inner.policy.autosaves_remotely() {
            for slot in collection.slots.values_mut() {
                if slot.store.sync_state().has_unsynced_changes() {
                    let ticket = slot.store.begin_flush();
                    slot.store.finish_flush(ticket, true);
                }
            }
        }
        info!(
            "event=navigation_flush module=sync status={} kind={} unsynced={unsynced}",
            if written { "ok" } else { "error" },
            A::KIND
        );
        written
    }
}

impl<A: OwnerScoped> SyncEngine<A> {
    /// Id of the owner's single aggregate.
    pub fn owner_key(&self) -> AggregateId {
        AggregateId::durable(self.inner.cache.owner_id())
    }

    /// Cold-start load; replaces whatever the engine held.
    pub async fn load(&self) -> LoadSource {
        let inner = &self.inner;
        let loaded = ColdStartLoader::new(&inner.cache, &inner.remote, &inner.session)
            .load::<A>()
            .await;

        let mut collection = inner.lock();
        collection.slots.clear();
        collection.slots.insert(
            loaded.aggregate.id().clone(),
            Slot::new(StateStore::clean(loaded.aggregate)),
        );
        loaded.source
    }

    pub fn current(&self) -> Option<A> {
        self.get(&self.owner_key())
    }

    pub fn edit(&self, patch: A::Patch) -> SyncResult<()> {
        self.apply(&self.owner_key(), patch)
    }

    pub async fn save_current(&self, action: SaveAction) -> SyncResult<SaveOutcome> {
        self.save(&self.owner_key(), action).await
    }
}
