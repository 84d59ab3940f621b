//! Core engine for studycal
//!
//! This crate is the heart of studycal, containing:
//! - Achievement calculation (daily and range aggregation, sum-then-rate)
//! - Rate to color band mapping and theme tokens
//! - The append-only session log
//! - Capacity-bounded, deduplicating backup snapshots
//! - Restore with a time-boxed undo window (Idle -> Active -> Idle)
//! - Sanitization and repair of persisted data
//! - `StudyEngine`, which wires the above to a `Store`

mod achievement;
mod calendar;
mod color;
mod engine;
mod events;
mod input;
mod restore;
mod sanitize;
mod session_log;
mod snapshot;

pub use achievement::*;
pub use calendar::*;
pub use color::*;
pub use engine::*;
pub use events::*;
pub use input::*;
pub use restore::*;
pub use sanitize::*;
pub use session_log::*;
pub use snapshot::*;
