//! Aggregate contract shared by every editable kind.
//!
//! # Responsibility
//! - Define what the sync engine needs from an editable unit.
//! - Define workflow gate failures (`ValidationError`).
//!
//! # Invariants
//! - `KIND` is unique per implementing type.
//! - `apply_patch` is a pure in-memory merge; it never performs I/O.
//! - Default method bodies describe an aggregate without workflow status,
//!   parent reference or outgoing references.

use crate::model::identifier::AggregateId;
use crate::model::session::SessionIdentity;
use crate::model::status::WorkflowStatus;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Kind of editable aggregate; also the namespace prefix for cache keys and
/// the path segment for remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
    Profile,
    Memo,
    Question,
    Exam,
}

impl AggregateKind {
    pub const ALL: [AggregateKind; 4] = [Self::Profile, Self::Memo, Self::Question, Self::Exam];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Memo => "memo",
            Self::Question => "question",
            Self::Exam => "exam",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "profile" => Some(Self::Profile),
            "memo" => Some(Self::Memo),
            "question" => Some(Self::Question),
            "exam" => Some(Self::Exam),
            _ => None,
        }
    }
}

impl Display for AggregateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow gate failure. The aggregate keeps its previous status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is blank.
    MissingField(&'static str),
    /// Multiple-choice aggregate has fewer options than required.
    TooFewOptions { found: usize, required: usize },
    /// Option at `index` has blank text.
    EmptyOption { index: usize },
    /// Multiple-choice aggregate has no option marked correct.
    NoCorrectOption,
    /// Numeric field is out of range.
    OutOfRange { field: &'static str, value: i64 },
    /// Requested status is behind the current one.
    StatusRegression {
        from: WorkflowStatus,
        to: WorkflowStatus,
    },
    /// Aggregate kind carries no workflow status.
    NotWorkflowAggregate(AggregateKind),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field `{field}` is empty"),
            Self::TooFewOptions { found, required } => write!(
                f,
                "multiple choice needs at least {required} options, found {found}"
            ),
            Self::EmptyOption { index } => write!(f, "option {} is empty", index + 1),
            Self::NoCorrectOption => write!(f, "no option is marked correct"),
            Self::OutOfRange { field, value } => {
                write!(f, "field `{field}` is out of range: {value}")
            }
            Self::StatusRegression { from, to } => {
                write!(f, "status cannot move back from `{from}` to `{to}`")
            }
            Self::NotWorkflowAggregate(kind) => {
                write!(f, "`{kind}` aggregates have no workflow status")
            }
        }
    }
}

impl Error for ValidationError {}

/// Editable unit managed by the sync engine.
pub trait Aggregate: Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Partial update produced by an editing surface.
    type Patch: Debug + Send + 'static;

    const KIND: AggregateKind;

    /// Whether the remote authority keys this aggregate by owner id, so it
    /// is always updated in place and never created.
    const OWNER_KEYED: bool = false;

    /// Whether create/update calls must carry a durable parent reference.
    const REQUIRES_PARENT: bool = false;

    fn id(&self) -> &AggregateId;

    fn set_id(&mut self, id: AggregateId);

    /// Merges `patch` into this value. Absent patch fields are left unchanged.
    fn apply_patch(&mut self, patch: Self::Patch);

    /// Unix epoch milliseconds of the latest local edit.
    fn last_modified_at(&self) -> i64;

    fn set_last_modified_at(&mut self, at_ms: i64);

    fn status(&self) -> Option<WorkflowStatus> {
        None
    }

    /// Only called by the status lifecycle controller.
    fn set_status(&mut self, _status: WorkflowStatus) {}

    /// Parent aggregate this value belongs to (e.g. the owning exam).
    fn parent_reference(&self) -> Option<&AggregateId> {
        None
    }

    /// Structural checks that gate entry into `target`.
    fn validate_for(&self, _target: WorkflowStatus) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Rewrites every reference to `old` (an aggregate of `kind`) into `new`.
    ///
    /// Returns whether anything changed.
    fn rewrite_reference(
        &mut self,
        _kind: AggregateKind,
        _old: &AggregateId,
        _new: &AggregateId,
    ) -> bool {
        false
    }

    /// Removes every reference to a deleted aggregate of `kind`.
    ///
    /// Returns whether anything changed.
    fn drop_reference(&mut self, _kind: AggregateKind, _id: &AggregateId) -> bool {
        false
    }
}

/// Aggregate that exists at most once per owner and is loaded by owner id.
pub trait OwnerScoped: Aggregate {
    /// Historical single-field cache keys, stored as `{field}_{ownerId}`.
    const LEGACY_FIELDS: &'static [&'static str];

    /// Hard-coded defaults for an owner with no stored data.
    fn defaults(owner_id: &str) -> Self;

    /// Assembles a best-effort value from legacy single-field records.
    ///
    /// `fields` only contains keys that were present.
    fn from_legacy(owner_id: &str, fields: &BTreeMap<String, String>) -> Self;

    /// Overlays authenticated session fields onto a loaded value.
    fn apply_session(&mut self, _session: &SessionIdentity) {}
}

/// Current wall clock in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// Overwrites `target` when `patch` carries a value.
pub(crate) fn merge_field<T>(target: &mut T, patch: Option<T>) {
    if let Some(value) = patch {
        *target = value;
    }
}
