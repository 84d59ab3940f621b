//! Error types for studycal

use thiserror::Error;

/// Core error type for studycal operations
#[derive(Debug, Error)]
pub enum StudycalError {
    #[error("Backup not found: {0}")]
    BackupNotFound(String),

    #[error("No restore in progress")]
    NoActiveRestore,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    StoreError(String),
}

impl StudycalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, StudycalError>;
