//! Data types for studycal
//!
//! This crate defines the plain values the core exchanges with the outer
//! layers (UI, storage, CLI):
//! - Plans, records and session log entries
//! - Achievement results and color bands
//! - Backup snapshots and the restore context
//!
//! Everything here serializes to camelCase JSON so persisted data stays
//! portable.

mod color;
mod snapshot;
mod types;

pub use color::*;
pub use snapshot::*;
pub use types::*;
