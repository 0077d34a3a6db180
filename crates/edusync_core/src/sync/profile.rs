//! Profile child collections: education, experience and project entries.
//!
//! # Responsibility
//! - Add, edit, save and delete one child entry of the owner's profile.
//!
//! # Invariants
//! - A temporary entry is created with `POST`; a durable one is updated
//!   with `PUT`. The first successful `POST` re-keys the entry once.
//! - Saving an entry pauses the profile's autosave, waits for a running
//!   profile write, and re-arms the autosave afterwards if profile fields
//!   are still unsynced.

use crate::error::{SyncError, SyncResult};
use crate::model::aggregate::AggregateKind;
use crate::model::identifier::AggregateId;
use crate::model::profile::{ChildKind, EntryEdit, EntryPatch, Profile, ProfileEntry, ProfilePatch};
use crate::remote::RemoteError;
use crate::sync::engine::{SaveOutcome, SyncEngine};
use log::{info, warn};

impl SyncEngine<Profile> {
    /// Adds a new entry locally. Returns its temporary id.
    pub fn add_entry(&self, kind: ChildKind, entry: ProfileEntry) -> SyncResult<AggregateId> {
        let entry_id = entry.id.clone();
        self.edit(ProfilePatch {
            entries: vec![EntryEdit::Insert(kind, entry)],
            ..ProfilePatch::default()
        })?;
        Ok(entry_id)
    }

    pub fn update_entry(
        &self,
        kind: ChildKind,
        entry_id: &AggregateId,
        patch: EntryPatch,
    ) -> SyncResult<()> {
        let entry_id = self.resolve(entry_id);
        self.edit(ProfilePatch {
            entries: vec![EntryEdit::Update(kind, entry_id, patch)],
            ..ProfilePatch::default()
        })
    }

    /// Explicit save of one entry through the child collection endpoint.
    pub async fn save_entry(
        &self,
        kind: ChildKind,
        entry_id: &AggregateId,
    ) -> SyncResult<SaveOutcome> {
        let inner = &self.inner;
        let owner_key = self.owner_key();
        let writer = inner.claim_writer(&owner_key)?;
        let _turn = writer.lock().await;

        let (entry_id, entry) = {
            let mut collection = inner.lock();
            let entry_id = collection.reconciler.resolve(entry_id);
            let entries = collection.snapshot_all();
            let (_, slot) = collection.slot_mut(&owner_key)?;
            let entry = slot
                .store
                .current()
                .entry(kind, &entry_id)
                .cloned()
                .ok_or_else(|| SyncError::UnknownAggregate(entry_id.clone()))?;
            inner.persist_locally(&entries);
            (entry_id, entry)
        };

        let owner_id = self.owner_id();
        let result = match entry_id.as_durable() {
            Some(child_id) => {
                inner
                    .remote
                    .update_child(AggregateKind::Profile, owner_id, kind.as_str(), child_id, &entry)
                    .await
            }
            None => {
                inner
                    .remote
                    .create_child(AggregateKind::Profile, owner_id, kind.as_str(), &entry)
                    .await
            }
        };

        let outcome = match result {
            Ok(stored) if entry_id.is_temporary() => {
                if stored.id.is_durable() {
                    self.reconcile_entry(kind, &entry_id, &stored.id)
                        .map(|()| SaveOutcome::Synced {
                            id: stored.id,
                            status: None,
                        })
                } else {
                    Err(SyncError::Remote(RemoteError::Decode(format!(
                        "{kind} entry response carries no durable id"
                    ))))
                }
            }
            Ok(_) => Ok(SaveOutcome::Synced {
                id: entry_id.clone(),
                status: None,
            }),
            Err(err) if err.is_transient() => Ok(SaveOutcome::SavedLocally {
                id: entry_id.clone(),
                reason: err,
            }),
            Err(err) => Err(SyncError::Remote(err)),
        };

        self.resume_autosave(&owner_key);
        match &outcome {
            Ok(saved) => info!(
                "event=profile_entry_save module=sync status={} section={kind} id={}",
                if saved.is_synced() { "ok" } else { "saved_locally" },
                saved.id()
            ),
            Err(err) => warn!(
                "event=profile_entry_save module=sync status=error section={kind} id={entry_id} error={err}"
            ),
        }
        outcome
    }

    /// Explicit delete of one entry. A durable entry is deleted remotely first.
    pub async fn delete_entry(&self, kind: ChildKind, entry_id: &AggregateId) -> SyncResult<()> {
        let entry_id = self.resolve(entry_id);
        if let Some(child_id) = entry_id.as_durable() {
            match self
                .inner
                .remote
                .delete_child(AggregateKind::Profile, self.owner_id(), kind.as_str(), child_id)
                .await
            {
                Ok(()) | Err(RemoteError::Status { status: 404, .. }) => {}
                Err(err) => {
                    warn!(
                        "event=profile_entry_delete module=sync status=error section={kind} id={entry_id} error={err}"
                    );
                    return Err(SyncError::Remote(err));
                }
            }
        }

        self.edit(ProfilePatch {
            entries: vec![EntryEdit::Remove(kind, entry_id.clone())],
            ..ProfilePatch::default()
        })?;
        info!("event=profile_entry_delete module=sync status=ok section={kind} id={entry_id}");
        Ok(())
    }

    fn reconcile_entry(
        &self,
        kind: ChildKind,
        temporary: &AggregateId,
        durable: &AggregateId,
    ) -> SyncResult<()> {
        let owner_key = self.owner_key();
        let mut collection = self.inner.lock();
        collection.reconciler.record(temporary, durable)?;
        let entries = {
            let (_, slot) = collection.slot_mut(&owner_key)?;
            slot.store
                .reidentify(|profile| profile.replace_entry_id(kind, temporary, durable));
            collection.snapshot_all()
        };
        self.inner.persist_locally(&entries);
        Ok(())
    }

    fn resume_autosave(&self, owner_key: &AggregateId) {
        let mut collection = self.inner.lock();
        if let Ok((id, slot)) = collection.slot_mut(owner_key) {
            if slot.store.sync_state().has_unsynced_changes() {
                self.inner.schedule(slot, id);
            }
        }
    }
}
