//! Backup snapshot and restore context types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use studycal_util::SnapshotId;

use crate::{ActualRecord, PlanEntry, SessionLogEntry, StudyData};

/// Point-in-time copy of records, plans and the session log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub id: SnapshotId,
    pub created_at: DateTime<Local>,
    pub records: Vec<ActualRecord>,
    pub plans: Vec<PlanEntry>,
    #[serde(default)]
    pub sessions: Vec<SessionLogEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl BackupSnapshot {
    /// Deep copy of `data` under a fresh id
    pub fn capture(data: &StudyData, created_at: DateTime<Local>, note: Option<String>) -> Self {
        Self {
            id: SnapshotId::new(),
            created_at,
            records: data.records.clone(),
            plans: data.plans.clone(),
            sessions: data.sessions.clone(),
            note,
        }
    }

    /// Content equality, ignoring id, timestamp and note
    pub fn same_content(&self, other: &BackupSnapshot) -> bool {
        self.records == other.records
            && self.plans == other.plans
            && self.sessions == other.sessions
    }

    /// The data triple held by this snapshot
    pub fn data(&self) -> StudyData {
        StudyData {
            records: self.records.clone(),
            plans: self.plans.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

/// Undo window opened by a restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreContext {
    pub previous_records: Vec<ActualRecord>,
    pub previous_plans: Vec<PlanEntry>,
    #[serde(default)]
    pub previous_sessions: Vec<SessionLogEntry>,
    pub backup_id: SnapshotId,
    pub applied_at: DateTime<Local>,
    pub expires_at: DateTime<Local>,
}

impl RestoreContext {
    pub fn new(
        previous: StudyData,
        backup_id: SnapshotId,
        applied_at: DateTime<Local>,
        ttl: std::time::Duration,
    ) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        Self {
            previous_records: previous.records,
            previous_plans: previous.plans,
            previous_sessions: previous.sessions,
            backup_id,
            applied_at,
            expires_at: applied_at + ttl,
        }
    }

    /// Expired contexts are treated as absent
    pub fn is_expired(&self, now: DateTime<Local>) -> bool {
        now >= self.expires_at
    }

    /// The state captured before the restore was applied
    pub fn previous_data(&self) -> StudyData {
        StudyData {
            records: self.previous_records.clone(),
            plans: self.previous_plans.clone(),
            sessions: self.previous_sessions.clone(),
        }
    }
}
