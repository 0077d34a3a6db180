//! Workflow status for review-gated aggregates.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Ordered workflow stage. Declaration order is the transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Initial stage for new aggregates.
    Draft,
    /// Entered by an explicit "save for review" action.
    UnderReview,
    /// Entered by an explicit "save final" action.
    Finalized,
}

impl WorkflowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::UnderReview => "under_review",
            Self::Finalized => "finalized",
        }
    }
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl Display for WorkflowStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit user action that may move an aggregate forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveAction {
    /// Persist remotely without changing workflow status.
    Save,
    /// Persist remotely and enter `UnderReview`.
    SaveForReview,
    /// Persist remotely and enter `Finalized`.
    SaveFinal,
}

impl SaveAction {
    /// Status this action requests, if it requests one.
    pub fn target_status(self) -> Option<WorkflowStatus> {
        match self {
            Self::Save => None,
            Self::SaveForReview => Some(WorkflowStatus::UnderReview),
            Self::SaveFinal => Some(WorkflowStatus::Finalized),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Save => "save",
            Self::SaveForReview => "save_for_review",
            Self::SaveFinal => "save_final",
        }
    }
}
