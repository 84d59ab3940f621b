//! Core events emitted by the engine

use chrono::{DateTime, Local, NaiveDate};
use serde::Serialize;
use studycal_api::LogKind;
use studycal_util::SnapshotId;

/// Events emitted by the study engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CoreEvent {
    /// A plan was set, changed or removed
    PlanChanged {
        date: NaiveDate,
        previous_minutes: u32,
        minutes: u32,
    },

    /// Actual study time was added, edited or removed
    RecordChanged {
        date: NaiveDate,
        previous_minutes: u32,
        minutes: u32,
    },

    /// The session log for a date was cleared
    HistoryCleared {
        date: NaiveDate,
        removed: usize,
    },

    /// A new backup snapshot was stored (not emitted for deduplicated ones)
    SnapshotCreated {
        snapshot_id: SnapshotId,
        note: Option<String>,
    },

    BackupDeleted {
        snapshot_id: SnapshotId,
    },

    BackupsCleared {
        count: usize,
    },

    /// A backup was applied; undo is possible until `expires_at`
    RestoreApplied {
        backup_id: SnapshotId,
        expires_at: DateTime<Local>,
    },

    /// The undo window was used to return to the pre-restore state
    RestoreUndone {
        backup_id: SnapshotId,
    },

    /// The restored data was accepted; undo is no longer offered
    RestoreDismissed {
        backup_id: SnapshotId,
    },

    /// The undo window closed on its own
    RestoreExpired {
        backup_id: SnapshotId,
    },
}

impl CoreEvent {
    /// Event for a minute change of the given kind
    pub fn minutes_changed(kind: LogKind, date: NaiveDate, previous: u32, minutes: u32) -> Self {
        match kind {
            LogKind::Plan => CoreEvent::PlanChanged {
                date,
                previous_minutes: previous,
                minutes,
            },
            LogKind::Actual => CoreEvent::RecordChanged {
                date,
                previous_minutes: previous,
                minutes,
            },
        }
    }
}
