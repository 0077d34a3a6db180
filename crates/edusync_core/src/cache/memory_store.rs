//! Process-local key-value store with an optional byte quota.

use super::{CacheError, CacheResult, KeyValueStore};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory `KeyValueStore`.
///
/// Used for sessions without a cache file and as the test double for the
/// durable cache. `set_unavailable(true)` makes every write fail as if the
/// device storage were full.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
    quota_bytes: Option<usize>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store rejecting writes beyond `quota_bytes` of payload.
    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            quota_bytes: Some(quota_bytes),
            ..Self::default()
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn write(&self, key: &str, value: &str) -> CacheResult<()> {
        let mut entries = self.entries();
        let used_elsewhere: usize = entries
            .iter()
            .filter(|(existing, _)| existing.as_str() != key)
            .map(|(_, payload)| payload.len())
            .sum();

        let available = if self.unavailable.load(Ordering::SeqCst) {
            Some(0)
        } else {
            self.quota_bytes
                .map(|quota| quota.saturating_sub(used_elsewhere))
        };
        if let Some(available) = available {
            if value.len() > available {
                return Err(CacheError::QuotaExceeded {
                    key: key.to_string(),
                    requested: value.len(),
                    available,
                });
            }
        }

        entries.insert(key.to_string(), value.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&self, key: &str) -> CacheResult<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn remove(&self, key: &str) -> CacheResult<bool> {
        Ok(self.entries().remove(key).is_some())
    }

    fn keys(&self) -> CacheResult<Vec<String>> {
        Ok(self.entries().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryKeyValueStore;
    use crate::cache::{CacheError, KeyValueStore};

    #[test]
    fn quota_counts_replacement_of_same_key_once() {
        let store = MemoryKeyValueStore::with_quota(8);
        store.write("a", "1234").unwrap();
        store.write("a", "12345678").unwrap();

        let err = store.write("b", "1").unwrap_err();
        assert!(matches!(
            err,
            CacheError::QuotaExceeded { available: 0, .. }
        ));
        assert_eq!(store.read("a").unwrap().as_deref(), Some("12345678"));
    }

    #[test]
    fn unavailable_store_rejects_writes_but_keeps_reads() {
        let store = MemoryKeyValueStore::new();
        store.write("memo_u1", "{}").unwrap();
        store.set_unavailable(true);

        assert!(store.write("memo_u1", "{\"x\":1}").is_err());
        assert_eq!(store.read("memo_u1").unwrap().as_deref(), Some("{}"));
        assert_eq!(store.write_count(), 1);
    }
}
