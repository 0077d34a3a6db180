//! Local-first persistence and sync engine for course-authoring editors.
//!
//! Edits land in memory first, are debounced into a durable local cache and,
//! per kind policy, pushed to the remote authority. Explicit saves drive the
//! draft → under_review → finalized workflow.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod remote;
pub mod sync;

pub use cache::{
    CacheError, CacheRecord, KeyValueStore, MemoryKeyValueStore, NamespacedCache,
    SqliteKeyValueStore,
};
pub use config::{AutosaveTarget, ConfigError, EngineConfig, KindPolicies, KindPolicy};
pub use error::{IdentityError, SyncError, SyncResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::aggregate::{Aggregate, AggregateKind, OwnerScoped, ValidationError};
pub use model::exam::{Exam, ExamPatch};
pub use model::identifier::AggregateId;
pub use model::memo::{Memo, MemoPatch};
pub use model::profile::{ChildKind, EntryPatch, Profile, ProfileEntry, ProfilePatch};
pub use model::question::{ChoiceOption, Question, QuestionPatch, QuestionType};
pub use model::session::SessionIdentity;
pub use model::status::{SaveAction, WorkflowStatus};
pub use remote::{ErrorClass, HttpTransport, RemoteClient, RemoteError, RemoteTransport};
pub use sync::{LoadSource, SaveOutcome, SyncContext, SyncEngine, SyncState};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
