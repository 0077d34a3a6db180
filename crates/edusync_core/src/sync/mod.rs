//! Local-first sync: state store, debounced writes, explicit actions,
//! identity reconciliation, status lifecycle and cold-start loading.

pub mod engine;
pub mod lifecycle;
pub mod loader;
mod profile;
pub mod reconcile;
pub mod scheduler;
pub mod state;

pub use engine::{SaveOutcome, SyncContext, SyncEngine};
pub use loader::{ColdStartLoader, LoadSource, Loaded};
pub use reconcile::{IdentityReconciler, ReconcileOutcome, ReferenceRewriter};
pub use scheduler::DebounceTimer;
pub use state::{StateStore, SyncState};
