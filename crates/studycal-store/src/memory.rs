//! In-memory store

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::{Store, StoreError, StoreKey, StoreResult};

/// Process-local store. Reads and writes can be made to fail so callers'
/// degradation paths can be exercised.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StoreKey, String>>,

    /// Configure reads to fail
    pub fail_reads: AtomicBool,

    /// Configure writes (set/remove) to fail
    pub fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn values(&self) -> StoreResult<std::sync::MutexGuard<'_, HashMap<StoreKey, String>>> {
        self.values
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }
}

impl Store for MemoryStore {
    fn get(&self, key: StoreKey) -> StoreResult<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("read of {} failed", key)));
        }
        Ok(self.values()?.get(&key).cloned())
    }

    fn set(&self, key: StoreKey, value: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("write of {} failed", key)));
        }
        self.values()?.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("remove of {} failed", key)));
        }
        self.values()?.remove(&key);
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        !self.fail_reads.load(Ordering::SeqCst) && !self.fail_writes.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let store = MemoryStore::new();
        store.set(StoreKey::Sessions, "[]").unwrap();
        assert_eq!(store.get(StoreKey::Sessions).unwrap().as_deref(), Some("[]"));
        store.remove(StoreKey::Sessions).unwrap();
        assert!(store.get(StoreKey::Sessions).unwrap().is_none());
    }

    #[test]
    fn test_failure_injection() {
        let store = MemoryStore::new();
        store.set(StoreKey::Backups, "[]").unwrap();

        store.set_fail_writes(true);
        assert!(store.set(StoreKey::Backups, "[1]").is_err());
        assert!(!store.is_healthy());

        store.set_fail_reads(true);
        assert!(store.get(StoreKey::Backups).is_err());

        store.set_fail_reads(false);
        store.set_fail_writes(false);
        assert_eq!(store.get(StoreKey::Backups).unwrap().as_deref(), Some("[]"));
    }
}
