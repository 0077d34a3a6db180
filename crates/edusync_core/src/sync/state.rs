//! In-memory state store for one aggregate.
//!
//! # Responsibility
//! - Hold the current value the editing surface reads from.
//! - Track whether the value still has changes that were not flushed.
//!
//! # Invariants
//! - Every user edit bumps the edit generation and stamps `last_modified_at`.
//! - A flush that started before a later edit never marks the store clean.
//! - Identifier and status rewrites are not user edits.

use crate::model::aggregate::{now_epoch_ms, Aggregate, AggregateKind};
use crate::model::identifier::AggregateId;
use crate::model::status::WorkflowStatus;

/// Flush state of one aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Clean,
    Dirty,
    Flushing,
    /// Last flush did not reach its target; changes are kept locally.
    FlushFailed,
}

impl SyncState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Dirty => "dirty",
            Self::Flushing => "flushing",
            Self::FlushFailed => "flush_failed",
        }
    }

    /// Whether the value holds changes its flush target has not accepted.
    pub fn has_unsynced_changes(self) -> bool {
        self != Self::Clean
    }
}

/// Marker of the edit generation a flush is writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushTicket {
    generation: u64,
}

#[derive(Debug)]
pub struct StateStore<A: Aggregate> {
    current: A,
    sync_state: SyncState,
    generation: u64,
}

impl<A: Aggregate> StateStore<A> {
    /// Wraps a value that matches what is already stored.
    pub fn clean(current: A) -> Self {
        Self {
            current,
            sync_state: SyncState::Clean,
            generation: 0,
        }
    }

    /// Wraps a value that was never flushed.
    pub fn unsaved(current: A) -> Self {
        Self {
            current,
            sync_state: SyncState::Dirty,
            generation: 1,
        }
    }

    pub fn current(&self) -> &A {
        &self.current
    }

    pub fn snapshot(&self) -> A {
        self.current.clone()
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync_state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Merges one user edit. The UI reads the result immediately.
    pub fn apply(&mut self, patch: A::Patch) {
        self.current.apply_patch(patch);
        self.current.set_last_modified_at(now_epoch_ms());
        self.mark_edited();
    }

    /// Swaps the aggregate's own identifier. Returns whether it matched `old`.
    pub fn replace_identifier(&mut self, old: &AggregateId, new: &AggregateId) -> bool {
        if self.current.id() != old {
            return false;
        }
        self.current.set_id(new.clone());
        true
    }

    /// Rewrites an outgoing reference. A change must be flushed again.
    pub fn rewrite_reference(
        &mut self,
        kind: AggregateKind,
        old: &AggregateId,
        new: &AggregateId,
    ) -> bool {
        let changed = self.current.rewrite_reference(kind, old, new);
        if changed {
            self.mark_edited();
        }
        changed
    }

    pub fn drop_reference(&mut self, kind: AggregateKind, id: &AggregateId) -> bool {
        let changed = self.current.drop_reference(kind, id);
        if changed {
            self.mark_edited();
        }
        changed
    }

    /// Applies an identity-only change (e.g. a child entry re-key).
    pub(crate) fn reidentify(&mut self, rewrite: impl FnOnce(&mut A) -> bool) -> bool {
        rewrite(&mut self.current)
    }

    /// Moves status forward to `target`; never backwards.
    pub(crate) fn advance_status(&mut self, target: WorkflowStatus) -> Option<WorkflowStatus> {
        let current = self.current.status()?;
        let next = current.max(target);
        self.current.set_status(next);
        Some(next)
    }

    pub fn begin_flush(&mut self) -> FlushTicket {
        self.sync_state = SyncState::Flushing;
        FlushTicket {
            generation: self.generation,
        }
    }

    /// Settles a flush. Edits made while it was running keep the store dirty.
    pub fn finish_flush(&mut self, ticket: FlushTicket, succeeded: bool) -> SyncState {
        self.sync_state = if ticket.generation != self.generation {
            SyncState::Dirty
        } else if succeeded {
            SyncState::Clean
        } else {
            SyncState::FlushFailed
        };
        self.sync_state
    }

    /// Forgets a flush whose task was cancelled before it settled.
    pub fn abandon_flush(&mut self) {
        if self.sync_state == SyncState::Flushing {
            self.sync_state = SyncState::Dirty;
        }
    }

    fn mark_edited(&mut self) {
        self.generation += 1;
        self.sync_state = SyncState::Dirty;
    }
}
