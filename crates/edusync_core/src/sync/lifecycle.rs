//! Status lifecycle controller: draft → under_review → finalized.
//!
//! # Invariants
//! - Status never moves backwards.
//! - A transition is only committed after the remote authority accepted
//!   the write; this module only decides whether it may be attempted.

use crate::model::aggregate::{Aggregate, ValidationError};
use crate::model::status::{SaveAction, WorkflowStatus};

/// Checks whether `aggregate` may enter `target`.
///
/// Re-entering the current status is allowed and re-runs the gate, so a
/// finalized aggregate edited into an invalid shape cannot be saved final.
pub fn check_transition<A: Aggregate>(
    aggregate: &A,
    target: WorkflowStatus,
) -> Result<WorkflowStatus, ValidationError> {
    let current = aggregate
        .status()
        .ok_or(ValidationError::NotWorkflowAggregate(A::KIND))?;
    if target < current {
        return Err(ValidationError::StatusRegression {
            from: current,
            to: target,
        });
    }
    aggregate.validate_for(target)?;
    Ok(target)
}

/// Resolves the status an explicit action asks for, if any, and gates it.
pub fn plan_action<A: Aggregate>(
    aggregate: &A,
    action: SaveAction,
) -> Result<Option<WorkflowStatus>, ValidationError> {
    match action.target_status() {
        Some(target) => check_transition(aggregate, target).map(Some),
        None => Ok(None),
    }
}
