//! Restore with a time-boxed undo window
//!
//! One slot, two states: `Idle` (no context) and `Active` (a context whose
//! `expires_at` is still ahead). The wall-clock deadline is what gets
//! persisted; while the process runs, expiry is driven by a one-shot timer
//! on the monotonic clock.

use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use studycal_api::{RestoreContext, StudyData};
use studycal_store::{put_json, Store, StoreKey};
use studycal_util::{saturating_until, MonotonicInstant, SnapshotId};
use tracing::{debug, info, warn};

use crate::{sanitize_data, SnapshotStore};

/// Note on the snapshot taken right before a restore is applied
pub const AUTO_BACKUP_NOTE: &str = "Auto backup before restore";

/// Note on the snapshot taken after an undo
pub const RESTORE_UNDONE_NOTE: &str = "Restore undone";

/// Cancelable, re-armable one-shot deadline on the monotonic clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiryTimer {
    deadline: Option<MonotonicInstant>,
}

impl ExpiryTimer {
    /// Arm (or re-arm) the timer to fire after `after`
    pub fn arm(&mut self, now_mono: MonotonicInstant, after: Duration) {
        self.deadline = Some(now_mono.checked_add(after).unwrap_or(now_mono));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_due(&self, now_mono: MonotonicInstant) -> bool {
        self.deadline.is_some_and(|d| now_mono >= d)
    }

    pub fn remaining(&self, now_mono: MonotonicInstant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_until(now_mono))
    }
}

/// Restore state machine over the single persisted context slot
pub struct RestoreCoordinator {
    store: Arc<dyn Store>,
    ttl: Duration,
    context: Option<RestoreContext>,
    timer: ExpiryTimer,
    unsaved: bool,
}

impl RestoreCoordinator {
    /// Load the persisted context, dropping it if it is expired or
    /// unreadable, and re-arm the timer for whatever window remains.
    pub fn open(
        store: Arc<dyn Store>,
        ttl: Duration,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Self {
        let mut this = Self {
            store,
            ttl,
            context: None,
            timer: ExpiryTimer::default(),
            unsaved: false,
        };

        let Some(stored) = this.read_persisted() else {
            return this;
        };
        match stored {
            Some(context) if context.is_expired(now) => {
                debug!(backup_id = %context.backup_id, "Persisted restore context expired, discarded");
                this.remove_persisted();
            }
            Some(context) => {
                info!(
                    backup_id = %context.backup_id,
                    remaining_secs = saturating_until(context.expires_at, now).as_secs(),
                    "Resuming restore undo window"
                );
                this.adopt(context, now, now_mono);
            }
            None => {}
        }

        this
    }

    /// Pick up changes another process made to the persisted slot.
    ///
    /// A context that was undone, dismissed or replaced elsewhere is dropped
    /// or replaced here without firing expiry and without writing anything.
    /// Returns whether the in-memory context changed.
    pub fn sync(&mut self, now: DateTime<Local>, now_mono: MonotonicInstant) -> bool {
        if self.unsaved {
            return false;
        }
        let Some(stored) = self.read_persisted() else {
            return false;
        };

        let same = match (&self.context, &stored) {
            (Some(ours), Some(theirs)) => {
                ours.backup_id == theirs.backup_id && ours.expires_at == theirs.expires_at
            }
            (None, None) => true,
            (None, Some(theirs)) => theirs.is_expired(now),
            _ => false,
        };
        if same {
            return false;
        }

        self.timer.cancel();
        self.context = None;
        match stored {
            Some(context) if !context.is_expired(now) => {
                info!(backup_id = %context.backup_id, "Restore context replaced by another process");
                self.adopt(context, now, now_mono);
            }
            _ => info!("Restore context closed by another process"),
        }
        true
    }

    fn adopt(&mut self, context: RestoreContext, now: DateTime<Local>, now_mono: MonotonicInstant) {
        self.timer.arm(now_mono, saturating_until(context.expires_at, now));
        self.context = Some(context);
    }

    // `None` when the slot cannot be read; `Some(None)` when it is empty
    // or malformed.
    fn read_persisted(&self) -> Option<Option<RestoreContext>> {
        let json = match self.store.get(StoreKey::RestoreContext) {
            Ok(Some(json)) => json,
            Ok(None) => return Some(None),
            Err(e) => {
                warn!(error = %e, "Failed to read restore context, ignoring it");
                return None;
            }
        };
        match serde_json::from_str::<RestoreContext>(&json) {
            Ok(context) => Some(Some(context)),
            Err(e) => {
                warn!(error = %e, "Persisted restore context is malformed, discarded");
                self.remove_persisted_quietly();
                Some(None)
            }
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The active context, if its window has not passed
    pub fn context(&self, now: DateTime<Local>) -> Option<&RestoreContext> {
        self.context.as_ref().filter(|c| !c.is_expired(now))
    }

    pub fn is_active(&self, now: DateTime<Local>) -> bool {
        self.context(now).is_some()
    }

    /// Time left on the monotonic timer
    pub fn remaining(&self, now_mono: MonotonicInstant) -> Option<Duration> {
        self.context.as_ref()?;
        self.timer.remaining(now_mono)
    }

    /// Apply backup `backup_id` over `current`.
    ///
    /// Snapshots `current` first, then returns the sanitized backup data to
    /// become live state. Unknown ids are a no-op returning `None`. A restore
    /// while another is active replaces it.
    pub fn restore(
        &mut self,
        backup_id: &SnapshotId,
        current: StudyData,
        snapshots: &mut SnapshotStore,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Option<StudyData> {
        let Some(backup) = snapshots.get(backup_id).cloned() else {
            debug!(backup_id = %backup_id, "Restore of unknown backup ignored");
            return None;
        };

        snapshots.create_snapshot(&current, Some(AUTO_BACKUP_NOTE.to_string()), now);

        let restored = sanitize_data(&backup.data());
        let context = RestoreContext::new(current, backup.id.clone(), now, self.ttl);

        info!(
            backup_id = %backup.id,
            expires_at = %context.expires_at.to_rfc3339(),
            "Backup restored"
        );

        self.context = Some(context);
        self.timer.arm(now_mono, self.ttl);
        self.persist();

        Some(restored)
    }

    /// Return to the pre-restore state.
    ///
    /// Returns the data to make live again and the backup that had been
    /// applied, or `None` when no window is open.
    pub fn undo(
        &mut self,
        snapshots: &mut SnapshotStore,
        now: DateTime<Local>,
    ) -> Option<(StudyData, SnapshotId)> {
        if self.context(now).is_none() {
            self.discard_if_expired(now);
            return None;
        }
        let context = self.take()?;
        let previous = sanitize_data(&context.previous_data());

        snapshots.create_snapshot(&previous, Some(RESTORE_UNDONE_NOTE.to_string()), now);
        info!(backup_id = %context.backup_id, "Restore undone");

        Some((previous, context.backup_id))
    }

    /// Accept the restored data and close the window
    pub fn dismiss(&mut self, now: DateTime<Local>) -> Option<SnapshotId> {
        if self.context(now).is_none() {
            self.discard_if_expired(now);
            return None;
        }
        let context = self.take()?;
        info!(backup_id = %context.backup_id, "Restore dismissed");
        Some(context.backup_id)
    }

    /// Fire the expiry timer if it is due
    pub fn tick(&mut self, now_mono: MonotonicInstant) -> Option<SnapshotId> {
        if !self.timer.is_due(now_mono) {
            return None;
        }
        let context = self.take()?;
        info!(backup_id = %context.backup_id, "Restore undo window expired");
        Some(context.backup_id)
    }

    /// Clear the context if it points at `backup_id`
    pub fn clear_if_backup(&mut self, backup_id: &SnapshotId) -> bool {
        if self.context.as_ref().is_some_and(|c| &c.backup_id == backup_id) {
            self.take();
            debug!(backup_id = %backup_id, "Restore context cleared with its backup");
            true
        } else {
            false
        }
    }

    /// Clear any context unconditionally
    pub fn clear(&mut self) -> Option<SnapshotId> {
        self.take().map(|c| c.backup_id)
    }

    fn discard_if_expired(&mut self, now: DateTime<Local>) {
        if self.context.as_ref().is_some_and(|c| c.is_expired(now)) {
            self.take();
        }
    }

    fn take(&mut self) -> Option<RestoreContext> {
        self.timer.cancel();
        let context = self.context.take()?;
        self.remove_persisted();
        Some(context)
    }

    /// Retry the last slot write if it failed
    pub fn flush(&mut self) {
        if !self.unsaved {
            return;
        }
        if self.context.is_some() {
            self.persist();
        } else {
            self.remove_persisted();
        }
    }

    pub fn is_unsaved(&self) -> bool {
        self.unsaved
    }

    fn persist(&mut self) {
        let Some(context) = &self.context else {
            return;
        };
        match put_json(self.store.as_ref(), StoreKey::RestoreContext, context) {
            Ok(()) => self.unsaved = false,
            Err(e) => {
                warn!(error = %e, "Failed to persist restore context");
                self.unsaved = true;
            }
        }
    }

    fn remove_persisted(&mut self) {
        match self.store.remove(StoreKey::RestoreContext) {
            Ok(()) => self.unsaved = false,
            Err(e) => {
                warn!(error = %e, "Failed to remove persisted restore context");
                self.unsaved = true;
            }
        }
    }

    fn remove_persisted_quietly(&self) {
        if let Err(e) = self.store.remove(StoreKey::RestoreContext) {
            warn!(error = %e, "Failed to remove persisted restore context");
        }
    }
}
