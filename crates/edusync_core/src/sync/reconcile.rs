//! Identity reconciliation: temporary ids become durable ids exactly once.
//!
//! # Responsibility
//! - Remember every temporary → durable mapping seen by one engine.
//! - Re-key collection entries and rewrite references held by siblings.
//!
//! # Invariants
//! - Mappings only go from a temporary id to a durable id.
//! - Repeating a known mapping is a no-op.
//! - A temporary id is never mapped to two different durable ids.
//! - After a mapping is recorded, `resolve` never returns the temporary id.

use crate::error::IdentityError;
use crate::model::aggregate::AggregateKind;
use crate::model::identifier::AggregateId;
use log::info;
use std::collections::BTreeMap;

/// Result of one `reconcile` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    /// Mapping was already recorded; nothing changed.
    AlreadyApplied,
}

/// Collection entry that can be re-keyed.
pub trait Rekey {
    fn replace_identifier(&mut self, old: &AggregateId, new: &AggregateId) -> bool;

    fn rewrite_reference(
        &mut self,
        kind: AggregateKind,
        old: &AggregateId,
        new: &AggregateId,
    ) -> bool;
}

/// Receiver of identity and deletion events from another engine.
///
/// Implemented by every engine so that, for example, exam membership lists
/// follow question ids.
pub trait ReferenceRewriter: Send + Sync {
    fn rewrite_reference(&self, kind: AggregateKind, old: &AggregateId, new: &AggregateId);

    fn drop_reference(&self, kind: AggregateKind, id: &AggregateId);
}

#[derive(Debug, Default)]
pub struct IdentityReconciler {
    mappings: BTreeMap<AggregateId, AggregateId>,
}

impl IdentityReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current identifier for `id`, following a recorded mapping.
    pub fn resolve(&self, id: &AggregateId) -> AggregateId {
        self.mappings
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.clone())
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }

    /// Records `temporary → durable` without touching any collection.
    ///
    /// Used for child entries that live inside one aggregate.
    pub fn record(
        &mut self,
        temporary: &AggregateId,
        durable: &AggregateId,
    ) -> Result<ReconcileOutcome, IdentityError> {
        if !temporary.is_temporary() || !durable.is_durable() {
            return Err(IdentityError::InvalidDirection {
                from: temporary.clone(),
                to: durable.clone(),
            });
        }
        match self.mappings.get(temporary) {
            Some(known) if known == durable => return Ok(ReconcileOutcome::AlreadyApplied),
            Some(known) => {
                return Err(IdentityError::AlreadyReconciled {
                    temporary: temporary.clone(),
                    durable: known.clone(),
                })
            }
            None => {}
        }
        if self.mappings.values().any(|known| known == durable) {
            return Err(IdentityError::DurableIdInUse(durable.clone()));
        }

        self.mappings.insert(temporary.clone(), durable.clone());
        Ok(ReconcileOutcome::Applied)
    }

    /// Replaces `temporary` with `durable` across `entries`.
    ///
    /// The entry keyed by `temporary` is re-keyed, and every entry's
    /// references to it (an aggregate of `kind`) are rewritten.
    pub fn reconcile<T: Rekey>(
        &mut self,
        kind: AggregateKind,
        entries: &mut BTreeMap<AggregateId, T>,
        temporary: &AggregateId,
        durable: &AggregateId,
    ) -> Result<ReconcileOutcome, IdentityError> {
        if entries.contains_key(temporary) && entries.contains_key(durable) {
            return Err(IdentityError::DurableIdInUse(durable.clone()));
        }
        let outcome = self.record(temporary, durable)?;
        if outcome == ReconcileOutcome::AlreadyApplied {
            return Ok(outcome);
        }

        if let Some(mut entry) = entries.remove(temporary) {
            entry.replace_identifier(temporary, durable);
            entries.insert(durable.clone(), entry);
        }
        for entry in entries.values_mut() {
            entry.rewrite_reference(kind, temporary, durable);
        }
        info!(
            "event=identity_reconcile module=sync status=ok kind={kind} temporary={temporary} durable={durable}"
        );
        Ok(outcome)
    }
}
