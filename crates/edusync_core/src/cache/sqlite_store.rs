//! SQLite-backed durable cache store.
//!
//! # Responsibility
//! - Persist namespaced cache entries in the `cache_entries` table.
//! - Enforce the configured byte quota before each write.
//!
//! # Invariants
//! - Each write is a single-row upsert; there is no multi-key transaction.
//! - `byte_len` mirrors the UTF-8 length of `payload`.

use super::{CacheError, CacheResult, KeyValueStore};
use crate::db::{open_db, open_db_in_memory};
use log::warn;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// `KeyValueStore` over one SQLite connection.
pub struct SqliteKeyValueStore {
    conn: Mutex<Connection>,
    quota_bytes: Option<usize>,
}

impl SqliteKeyValueStore {
    /// Opens (or creates) the cache file at `path`.
    pub fn open(path: impl AsRef<Path>, quota_bytes: Option<usize>) -> CacheResult<Self> {
        Ok(Self::from_connection(open_db(path)?, quota_bytes))
    }

    pub fn open_in_memory(quota_bytes: Option<usize>) -> CacheResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?, quota_bytes))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection, quota_bytes: Option<usize>) -> Self {
        Self {
            conn: Mutex::new(conn),
            quota_bytes,
        }
    }

    /// Total payload bytes currently stored.
    pub fn used_bytes(&self) -> CacheResult<usize> {
        let used: i64 = self.conn().query_row(
            "SELECT COALESCE(SUM(byte_len), 0) FROM cache_entries;",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(used).unwrap_or(0))
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn write(&self, key: &str, value: &str) -> CacheResult<()> {
        let conn = self.conn();

        if let Some(quota) = self.quota_bytes {
            let used_elsewhere: i64 = conn.query_row(
                "SELECT COALESCE(SUM(byte_len), 0)
                 FROM cache_entries
                 WHERE namespace_key != ?1;",
                [key],
                |row| row.get(0),
            )?;
            let available = quota.saturating_sub(usize::try_from(used_elsewhere).unwrap_or(0));
            if value.len() > available {
                warn!(
                    "event=cache_write module=cache status=error error_code=quota_exceeded key={} requested={} available={}",
                    key,
                    value.len(),
                    available
                );
                return Err(CacheError::QuotaExceeded {
                    key: key.to_string(),
                    requested: value.len(),
                    available,
                });
            }
        }

        conn.execute(
            "INSERT INTO cache_entries (namespace_key, payload, byte_len, updated_at)
             VALUES (?1, ?2, ?3, (strftime('%s', 'now') * 1000))
             ON CONFLICT(namespace_key) DO UPDATE SET
                payload = excluded.payload,
                byte_len = excluded.byte_len,
                updated_at = excluded.updated_at;",
            params![key, value, value.len() as i64],
        )?;
        Ok(())
    }

    fn read(&self, key: &str) -> CacheResult<Option<String>> {
        let payload = self
            .conn()
            .query_row(
                "SELECT payload FROM cache_entries WHERE namespace_key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(payload)
    }

    fn remove(&self, key: &str) -> CacheResult<bool> {
        let changed = self.conn().execute(
            "DELETE FROM cache_entries WHERE namespace_key = ?1;",
            [key],
        )?;
        Ok(changed > 0)
    }

    fn keys(&self) -> CacheResult<Vec<String>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT namespace_key FROM cache_entries ORDER BY namespace_key ASC;")?;
        let mut rows = stmt.query([])?;
        let mut keys = Vec::new();
        while let Some(row) = rows.next()? {
            keys.push(row.get(0)?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteKeyValueStore;
    use crate::cache::{CacheError, KeyValueStore};

    #[test]
    fn write_read_and_remove() {
        let store = SqliteKeyValueStore::open_in_memory(None).unwrap();
        store.write("profile_u1", "{\"a\":1}").unwrap();
        store.write("profile_u1", "{\"a\":2}").unwrap();

        assert_eq!(
            store.read("profile_u1").unwrap().as_deref(),
            Some("{\"a\":2}")
        );
        assert_eq!(store.keys().unwrap(), vec!["profile_u1".to_string()]);
        assert!(store.remove("profile_u1").unwrap());
        assert!(!store.remove("profile_u1").unwrap());
        assert_eq!(store.read("profile_u1").unwrap(), None);
    }

    #[test]
    fn quota_rejects_oversized_write_and_keeps_previous_value() {
        let store = SqliteKeyValueStore::open_in_memory(Some(10)).unwrap();
        store.write("memo_u1", "short").unwrap();

        let err = store.write("memo_u1", "far too long for quota").unwrap_err();
        assert!(matches!(err, CacheError::QuotaExceeded { requested: 22, .. }));
        assert_eq!(store.read("memo_u1").unwrap().as_deref(), Some("short"));
        assert_eq!(store.used_bytes().unwrap(), 5);
    }
}
