//! Errors surfaced by explicit sync engine actions.
//!
//! Automatic flushes never return these; they log and fall back locally.

use crate::cache::CacheError;
use crate::model::aggregate::{AggregateKind, ValidationError};
use crate::model::identifier::AggregateId;
use crate::remote::{ErrorClass, RemoteError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SyncResult<T> = Result<T, SyncError>;

/// Identity reconciliation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Reconciliation must go from a temporary id to a durable id.
    InvalidDirection {
        from: AggregateId,
        to: AggregateId,
    },
    /// Temporary id was already reconciled to a different durable id.
    AlreadyReconciled {
        temporary: AggregateId,
        durable: AggregateId,
    },
    /// Durable id is already owned by another aggregate.
    DurableIdInUse(AggregateId),
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidDirection { from, to } => {
                write!(f, "cannot reconcile `{from}` into `{to}`")
            }
            Self::AlreadyReconciled { temporary, durable } => {
                write!(f, "`{temporary}` was already reconciled to `{durable}`")
            }
            Self::DurableIdInUse(id) => write!(f, "durable id `{id}` is already in use"),
        }
    }
}

impl Error for IdentityError {}

/// Failure of an explicit engine action.
#[derive(Debug)]
pub enum SyncError {
    /// Workflow gate refused the transition; status unchanged.
    Validation(ValidationError),
    /// Create/update needs a durable parent reference that is missing.
    MissingParentReference {
        kind: AggregateKind,
        id: AggregateId,
    },
    /// No aggregate with this id is held by the engine.
    UnknownAggregate(AggregateId),
    /// Engine already holds an aggregate with this id.
    DuplicateAggregate(AggregateId),
    /// Remote authority failure not recoverable locally.
    Remote(RemoteError),
    Identity(IdentityError),
    Cache(CacheError),
}

impl SyncError {
    /// Classification of the underlying remote failure, if any.
    pub fn remote_class(&self) -> Option<ErrorClass> {
        match self {
            Self::Remote(err) => Some(err.class()),
            _ => None,
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::MissingParentReference { kind, id } => write!(
                f,
                "{kind} `{id}` needs a saved parent before it can be sent"
            ),
            Self::UnknownAggregate(id) => write!(f, "aggregate not found: {id}"),
            Self::DuplicateAggregate(id) => write!(f, "aggregate already exists: {id}"),
            Self::Remote(err) => write!(f, "{err}"),
            Self::Identity(err) => write!(f, "{err}"),
            Self::Cache(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Remote(err) => Some(err),
            Self::Identity(err) => Some(err),
            Self::Cache(err) => Some(err),
            Self::MissingParentReference { .. }
            | Self::UnknownAggregate(_)
            | Self::DuplicateAggregate(_) => None,
        }
    }
}

impl From<ValidationError> for SyncError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RemoteError> for SyncError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

impl From<IdentityError> for SyncError {
    fn from(value: IdentityError) -> Self {
        Self::Identity(value)
    }
}

impl From<CacheError> for SyncError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}
