//! Capacity-bounded, deduplicating backup snapshot list
//!
//! Persistence failures never reach the caller: reads degrade to an empty
//! list and writes degrade to in-memory only, both with a warning.

use chrono::{DateTime, Local};
use std::sync::Arc;
use studycal_api::{BackupSnapshot, StudyData};
use studycal_store::{put_json, Store, StoreKey};
use studycal_util::SnapshotId;
use tracing::{debug, info, warn};

/// Backup snapshots, newest first
pub struct SnapshotStore {
    store: Arc<dyn Store>,
    max_backups: usize,
    snapshots: Vec<BackupSnapshot>,
    unsaved: bool,
}

impl SnapshotStore {
    /// Create a snapshot store and load what is persisted
    pub fn open(store: Arc<dyn Store>, max_backups: usize) -> Self {
        let mut this = Self {
            store,
            max_backups: max_backups.max(1),
            snapshots: Vec::new(),
            unsaved: false,
        };
        this.load();
        this
    }

    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Re-read the persisted list. Malformed data is treated as empty.
    pub fn load(&mut self) -> &[BackupSnapshot] {
        self.snapshots = match self.store.get(StoreKey::Backups) {
            Ok(Some(json)) => match serde_json::from_str::<Vec<BackupSnapshot>>(&json) {
                Ok(list) => list,
                Err(e) => {
                    warn!(error = %e, "Stored backups are malformed, treating as empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Failed to read backups, treating as empty");
                Vec::new()
            }
        };
        self.unsaved = false;
        debug!(count = self.snapshots.len(), "Backups loaded");
        &self.snapshots
    }

    pub fn snapshots(&self) -> &[BackupSnapshot] {
        &self.snapshots
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn latest(&self) -> Option<&BackupSnapshot> {
        self.snapshots.first()
    }

    pub fn get(&self, id: &SnapshotId) -> Option<&BackupSnapshot> {
        self.snapshots.iter().find(|s| &s.id == id)
    }

    /// Capture `data` as a new snapshot.
    ///
    /// If the content equals the most recent snapshot the list is returned
    /// unchanged. Otherwise the new snapshot goes first and the oldest are
    /// evicted past capacity.
    pub fn create_snapshot(
        &mut self,
        data: &StudyData,
        note: Option<String>,
        now: DateTime<Local>,
    ) -> &[BackupSnapshot] {
        let snapshot = BackupSnapshot::capture(data, now, note);

        if let Some(latest) = self.snapshots.first()
            && latest.same_content(&snapshot)
        {
            debug!(latest = %latest.id, "Snapshot identical to latest, skipped");
            return &self.snapshots;
        }

        info!(
            snapshot_id = %snapshot.id,
            note = snapshot.note.as_deref().unwrap_or(""),
            "Backup snapshot created"
        );
        self.snapshots.insert(0, snapshot);

        if self.snapshots.len() > self.max_backups {
            let evicted = self.snapshots.len() - self.max_backups;
            self.snapshots.truncate(self.max_backups);
            debug!(evicted, "Oldest backups evicted");
        }

        self.persist();
        &self.snapshots
    }

    /// Remove one snapshot. Unknown ids are a no-op.
    pub fn delete_by_id(&mut self, id: &SnapshotId) -> &[BackupSnapshot] {
        let before = self.snapshots.len();
        self.snapshots.retain(|s| &s.id != id);
        if self.snapshots.len() != before {
            info!(snapshot_id = %id, "Backup deleted");
            self.persist();
        }
        &self.snapshots
    }

    pub fn delete_all(&mut self) -> &[BackupSnapshot] {
        let count = self.snapshots.len();
        self.snapshots.clear();
        info!(count, "All backups deleted");
        self.persist();
        &self.snapshots
    }

    /// Retry the last write if it failed. The stored list is left alone
    /// otherwise.
    pub fn flush(&mut self) {
        if self.unsaved {
            self.persist();
        }
    }

    /// Whether the in-memory list has not reached the store
    pub fn is_unsaved(&self) -> bool {
        self.unsaved
    }

    // Failure keeps the in-memory list.
    fn persist(&mut self) {
        match put_json(self.store.as_ref(), StoreKey::Backups, &self.snapshots) {
            Ok(()) => self.unsaved = false,
            Err(e) => {
                warn!(error = %e, "Failed to persist backups, keeping them in memory");
                self.unsaved = true;
            }
        }
    }
}
