//! Store trait definitions

use std::fmt;

use crate::StoreResult;

/// The fixed set of documents studycal persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Records,
    Plans,
    Sessions,
    Backups,
    RestoreContext,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Records => "study-records",
            StoreKey::Plans => "study-plans",
            StoreKey::Sessions => "study-sessions",
            StoreKey::Backups => "study-backups",
            StoreKey::RestoreContext => "study-restore-context",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main store trait. Values are JSON documents.
pub trait Store: Send + Sync {
    /// Read the last written value for `key`
    fn get(&self, key: StoreKey) -> StoreResult<Option<String>>;

    /// Overwrite the value for `key`
    fn set(&self, key: StoreKey, value: &str) -> StoreResult<()>;

    /// Remove `key`; removing an absent key is not an error
    fn remove(&self, key: StoreKey) -> StoreResult<()>;

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Serialize `value` and write it under `key`
pub fn put_json<T: serde::Serialize + ?Sized>(
    store: &dyn Store,
    key: StoreKey,
    value: &T,
) -> StoreResult<()> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json)
}
