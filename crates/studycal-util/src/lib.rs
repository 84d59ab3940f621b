//! Shared utilities for studycal
//!
//! This crate provides:
//! - ID types (SnapshotId, LogEntryId)
//! - Time utilities (wall clock with mock support, monotonic time)
//! - Minute arithmetic (hours/minutes conversion, clamping)
//! - Error types
//! - Default paths for config and data directories

mod error;
mod ids;
mod minutes;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use minutes::*;
pub use paths::*;
pub use time::*;
