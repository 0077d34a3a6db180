//! Durable local cache: namespaced, per-owner key-value persistence.
//!
//! # Responsibility
//! - Define the key-value capability injected into the loader and engine.
//! - Derive namespace keys from owner identity and aggregate kind.
//! - Serialize aggregate collections into structured `CacheRecord`s.
//!
//! # Invariants
//! - Structured records live under `{kind}_{ownerId}`.
//! - Legacy single-field records live under `{field}_{ownerId}`.
//! - A successful write only means the value reached this device; callers
//!   never treat it as remote durability.
//! - There is no atomicity across keys.

use crate::db::DbError;
use crate::model::aggregate::{now_epoch_ms, Aggregate, AggregateKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod memory_store;
mod sqlite_store;

pub use memory_store::MemoryKeyValueStore;
pub use sqlite_store::SqliteKeyValueStore;

pub type CacheResult<T> = Result<T, CacheError>;

/// Local cache failure.
#[derive(Debug)]
pub enum CacheError {
    Db(DbError),
    /// Write rejected because the store's byte quota would be exceeded.
    QuotaExceeded {
        key: String,
        requested: usize,
        available: usize,
    },
    /// Stored payload could not be decoded.
    Corrupt { key: String, message: String },
    Serialization(serde_json::Error),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::QuotaExceeded {
                key,
                requested,
                available,
            } => write!(
                f,
                "cache quota exceeded writing `{key}`: {requested} bytes requested, {available} available"
            ),
            Self::Corrupt { key, message } => write!(f, "corrupt cache record `{key}`: {message}"),
            Self::Serialization(err) => write!(f, "cache serialization failed: {err}"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::QuotaExceeded { .. } | Self::Corrupt { .. } => None,
        }
    }
}

impl From<DbError> for CacheError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for CacheError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// On-device key-value capability.
///
/// Implementations must be usable from timer tasks, hence `Send + Sync`.
pub trait KeyValueStore: Send + Sync {
    fn write(&self, key: &str, value: &str) -> CacheResult<()>;
    fn read(&self, key: &str) -> CacheResult<Option<String>>;
    /// Returns whether a value was removed.
    fn remove(&self, key: &str) -> CacheResult<bool>;
    /// Returns all keys in ascending order.
    fn keys(&self) -> CacheResult<Vec<String>>;
}

/// Serialized collection of one aggregate kind for one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<A> {
    pub kind: AggregateKind,
    pub owner_id: String,
    /// Unix epoch milliseconds of the write.
    pub saved_at: i64,
    pub entries: Vec<A>,
}

/// Key-value store bound to one owner.
#[derive(Clone)]
pub struct NamespacedCache {
    store: Arc<dyn KeyValueStore>,
    owner_id: String,
}

impl NamespacedCache {
    pub fn new(store: Arc<dyn KeyValueStore>, owner_id: impl Into<String>) -> Self {
        Self {
            store,
            owner_id: owner_id.into(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    /// Key of the structured record for `kind`.
    pub fn record_key(&self, kind: AggregateKind) -> String {
        format!("{}_{}", kind.as_str(), self.owner_id)
    }

    /// Key of one historical single-field record.
    pub fn legacy_key(&self, field: &str) -> String {
        format!("{field}_{}", self.owner_id)
    }

    /// Writes the whole collection of `A` as one structured record.
    pub fn write_record<A: Aggregate>(&self, entries: &[A]) -> CacheResult<()> {
        let record = CacheRecord {
            kind: A::KIND,
            owner_id: self.owner_id.clone(),
            saved_at: now_epoch_ms(),
            entries: entries.to_vec(),
        };
        let payload = serde_json::to_string(&record)?;
        self.store.write(&self.record_key(A::KIND), &payload)
    }

    /// Reads the structured record of `A`, if present.
    ///
    /// A record written for another kind or owner is reported as corrupt.
    pub fn read_record<A: Aggregate>(&self) -> CacheResult<Option<CacheRecord<A>>> {
        let key = self.record_key(A::KIND);
        let Some(payload) = self.store.read(&key)? else {
            return Ok(None);
        };

        let record: CacheRecord<A> =
            serde_json::from_str(&payload).map_err(|err| CacheError::Corrupt {
                key: key.clone(),
                message: err.to_string(),
            })?;
        if record.kind != A::KIND || record.owner_id != self.owner_id {
            return Err(CacheError::Corrupt {
                key,
                message: format!(
                    "record belongs to `{}` of owner `{}`",
                    record.kind, record.owner_id
                ),
            });
        }
        Ok(Some(record))
    }

    pub fn remove_record(&self, kind: AggregateKind) -> CacheResult<bool> {
        self.store.remove(&self.record_key(kind))
    }

    /// Reads the legacy single-field records that are present.
    ///
    /// Blank values count as absent.
    pub fn read_legacy_fields(&self, fields: &[&str]) -> CacheResult<BTreeMap<String, String>> {
        let mut found = BTreeMap::new();
        for field in fields {
            if let Some(value) = self.store.read(&self.legacy_key(field))? {
                if !value.trim().is_empty() {
                    found.insert((*field).to_string(), value);
                }
            }
        }
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::{CacheError, KeyValueStore, MemoryKeyValueStore, NamespacedCache};
    use crate::model::aggregate::AggregateKind;
    use crate::model::memo::Memo;
    use crate::model::aggregate::OwnerScoped;
    use std::sync::Arc;

    #[test]
    fn keys_follow_kind_and_field_conventions() {
        let cache = NamespacedCache::new(Arc::new(MemoryKeyValueStore::new()), "u1");
        assert_eq!(cache.record_key(AggregateKind::Question), "question_u1");
        assert_eq!(cache.legacy_key("introduction"), "introduction_u1");
    }

    #[test]
    fn record_round_trip_keeps_entries() {
        let cache = NamespacedCache::new(Arc::new(MemoryKeyValueStore::new()), "u1");
        let mut memo = Memo::defaults("u1");
        memo.body = "Grade the quizzes".to_string();

        cache.write_record(&[memo.clone()]).unwrap();
        let record = cache.read_record::<Memo>().unwrap().unwrap();
        assert_eq!(record.owner_id, "u1");
        assert_eq!(record.entries, vec![memo]);
    }

    #[test]
    fn records_are_isolated_per_owner() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let first = NamespacedCache::new(store.clone(), "u1");
        let second = NamespacedCache::new(store, "u2");

        first.write_record(&[Memo::defaults("u1")]).unwrap();
        assert!(second.read_record::<Memo>().unwrap().is_none());
    }

    #[test]
    fn undecodable_record_is_corrupt() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.write("memo_u1", "{not json").unwrap();
        let cache = NamespacedCache::new(store, "u1");

        let err = cache.read_record::<Memo>().unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { key, .. } if key == "memo_u1"));
    }

    #[test]
    fn blank_legacy_values_count_as_absent() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.write("memo_text_u1", "  ").unwrap();
        store.write("memo_title_u1", "Monday").unwrap();
        let cache = NamespacedCache::new(store, "u1");

        let fields = cache
            .read_legacy_fields(&["memo_title", "memo_text"])
            .unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["memo_title"], "Monday");
    }
}
