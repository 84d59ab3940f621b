//! Persistence layer for studycal
//!
//! A small keyed document store. The core does not care where values live,
//! only that a read returns the last successfully written value or nothing.
//!
//! Provides:
//! - The `Store` trait and its fixed key set
//! - SQLite-backed store (file or in-memory)
//! - In-memory store with failure injection for tests

mod memory;
mod sqlite;
mod traits;

pub use memory::*;
pub use sqlite::*;
pub use traits::*;

use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<StoreError> for studycal_util::StudycalError {
    fn from(e: StoreError) -> Self {
        studycal_util::StudycalError::store(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
