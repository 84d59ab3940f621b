//! SQLite-based store implementation

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::{Store, StoreError, StoreKey, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- One JSON document per key
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }
}

impl Store for SqliteStore {
    fn get(&self, key: StoreKey) -> StoreResult<Option<String>> {
        let conn = self.lock()?;

        let value: Option<String> = conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key.as_str()], |row| {
                row.get(0)
            })
            .optional()?;

        Ok(value)
    }

    fn set(&self, key: StoreKey, value: &str) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute(
            r#"
            INSERT INTO kv (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key.as_str(), value, studycal_util::now().to_rfc3339()],
        )?;

        debug!(key = %key, bytes = value.len(), "Value stored");
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?", [key.as_str()])?;
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::put_json;

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn test_get_set_remove() {
        let store = SqliteStore::in_memory().unwrap();

        assert!(store.get(StoreKey::Records).unwrap().is_none());

        store.set(StoreKey::Records, "[]").unwrap();
        assert_eq!(store.get(StoreKey::Records).unwrap().as_deref(), Some("[]"));

        store.set(StoreKey::Records, r#"[{"date":"2025-01-01","minutes":5}]"#).unwrap();
        let value = store.get(StoreKey::Records).unwrap().unwrap();
        assert!(value.contains("2025-01-01"));

        // Keys are independent
        assert!(store.get(StoreKey::Plans).unwrap().is_none());

        store.remove(StoreKey::Records).unwrap();
        assert!(store.get(StoreKey::Records).unwrap().is_none());

        // Removing twice is fine
        store.remove(StoreKey::Records).unwrap();
    }

    #[test]
    fn test_put_json() {
        let store = SqliteStore::in_memory().unwrap();
        put_json(&store, StoreKey::Backups, &vec![1, 2, 3]).unwrap();
        assert_eq!(store.get(StoreKey::Backups).unwrap().as_deref(), Some("[1,2,3]"));
    }

    #[test]
    fn test_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studycal.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set(StoreKey::Plans, "[]").unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get(StoreKey::Plans).unwrap().as_deref(), Some("[]"));
    }
}
