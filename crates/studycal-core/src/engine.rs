//! Study engine
//!
//! Owns live records, plans and the session log, and wires them to the
//! achievement calculator, color mapper, snapshot store and restore
//! coordinator. Lifecycle is `open` (load and repair persisted state),
//! operate, then `flush`. Every change is written when it happens; `flush`
//! only retries writes that failed, so it never overwrites what another
//! process stored in the meantime.

use chrono::{DateTime, Local, NaiveDate};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use studycal_api::{
    AchievementResult, ActualRecord, BackupSnapshot, DateRange, LogKind, PlanEntry, RangeStats,
    RestoreContext, SessionLogEntry, StudyData, Theme, VisualToken,
};
use studycal_config::Settings;
use studycal_store::{put_json, Store, StoreKey};
use studycal_util::{MonotonicInstant, SnapshotId, MAX_MINUTES_PER_DAY};
use tracing::{debug, info, warn};

use crate::{
    repair_data, AchievementCalculator, ColorBandMapper, CoreEvent, IntegrityReport,
    RestoreCoordinator, SessionLog, SnapshotStore,
};

/// Note used when a manual backup is taken without one
pub const MANUAL_BACKUP_NOTE: &str = "Manual backup";

/// Session log `source` values written by the engine
pub mod source {
    pub const PLAN: &str = "plan";
    pub const RECORD: &str = "record";
    pub const EDIT: &str = "edit";
    pub const DELETE: &str = "delete";
}

/// The study engine
pub struct StudyEngine {
    settings: Settings,
    store: Arc<dyn Store>,
    calculator: AchievementCalculator,
    colors: ColorBandMapper,
    records: BTreeMap<NaiveDate, u32>,
    plans: BTreeMap<NaiveDate, PlanEntry>,
    log: SessionLog,
    snapshots: SnapshotStore,
    restore: RestoreCoordinator,
    integrity: IntegrityReport,
    unsaved: HashSet<StoreKey>,
}

impl StudyEngine {
    /// Open the engine on the current clocks
    pub fn open(settings: Settings, store: Arc<dyn Store>) -> Self {
        Self::open_at(settings, store, studycal_util::now(), MonotonicInstant::now())
    }

    /// Open the engine at explicit wall and monotonic times
    pub fn open_at(
        settings: Settings,
        store: Arc<dyn Store>,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Self {
        let records = read_value(store.as_ref(), StoreKey::Records);
        let plans = read_value(store.as_ref(), StoreKey::Plans);
        let sessions = read_value(store.as_ref(), StoreKey::Sessions);
        let (data, integrity) =
            repair_data(records.as_ref(), plans.as_ref(), sessions.as_ref(), now);

        let snapshots = SnapshotStore::open(store.clone(), settings.max_backups);
        let restore = RestoreCoordinator::open(store.clone(), settings.undo_window, now, now_mono);

        let mut engine = Self {
            calculator: AchievementCalculator::new(settings.rate_policy),
            colors: ColorBandMapper::new(settings.band_table, settings.theme),
            records: BTreeMap::new(),
            plans: BTreeMap::new(),
            log: SessionLog::new(),
            settings,
            store,
            snapshots,
            restore,
            integrity,
            unsaved: HashSet::new(),
        };
        engine.replace_live(data);

        if !engine.integrity.is_clean() {
            engine.persist_live();
        }

        info!(
            records = engine.records.len(),
            plans = engine.plans.len(),
            sessions = engine.log.len(),
            backups = engine.snapshots.len(),
            restore_active = engine.restore.is_active(now),
            "Study engine initialized"
        );

        engine
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// What the load-time repair pass changed
    pub fn integrity(&self) -> &IntegrityReport {
        &self.integrity
    }

    pub fn store_healthy(&self) -> bool {
        self.store.is_healthy()
    }

    // Queries

    /// Current live state as plain collections, ordered by date
    pub fn data(&self) -> StudyData {
        StudyData {
            records: self.records_vec(),
            plans: self.plans.values().cloned().collect(),
            sessions: self.log.entries().to_vec(),
        }
    }

    fn records_vec(&self) -> Vec<ActualRecord> {
        self.records
            .iter()
            .map(|(date, minutes)| ActualRecord {
                date: *date,
                minutes: *minutes,
            })
            .collect()
    }

    fn plans_vec(&self) -> Vec<PlanEntry> {
        self.plans.values().cloned().collect()
    }

    pub fn plan(&self, date: NaiveDate) -> Option<&PlanEntry> {
        self.plans.get(&date)
    }

    pub fn recorded_minutes(&self, date: NaiveDate) -> u32 {
        self.records.get(&date).copied().unwrap_or(0)
    }

    pub fn daily(&self, date: NaiveDate) -> AchievementResult {
        self.calculator
            .daily_achievement(&self.records_vec(), &self.plans_vec(), date)
    }

    pub fn weekly(&self, date: NaiveDate) -> RangeStats {
        self.calculator
            .weekly_stats(&self.records_vec(), &self.plans_vec(), date)
    }

    pub fn monthly(&self, date: NaiveDate) -> RangeStats {
        self.calculator
            .monthly_stats(&self.records_vec(), &self.plans_vec(), date)
    }

    pub fn yearly(&self, date: NaiveDate) -> RangeStats {
        self.calculator
            .yearly_stats(&self.records_vec(), &self.plans_vec(), date)
    }

    pub fn custom(&self, range: &DateRange) -> RangeStats {
        self.calculator
            .custom_range_stats(&self.records_vec(), &self.plans_vec(), range)
    }

    /// Visual token for `rate` under the configured table and theme
    pub fn color_for(&self, rate: u32) -> VisualToken {
        self.colors.color_for(rate)
    }

    pub fn color_for_theme(&self, rate: u32, theme: Theme) -> VisualToken {
        self.colors.color_for_theme(rate, theme)
    }

    /// Session log entries for one date, oldest first
    pub fn history(&self, date: NaiveDate) -> Vec<SessionLogEntry> {
        self.log.entries_for_date(date)
    }

    /// Full session log, newest first
    pub fn log(&self) -> &[SessionLogEntry] {
        self.log.entries()
    }

    pub fn backups(&self) -> &[BackupSnapshot] {
        self.snapshots.snapshots()
    }

    pub fn backup(&self, id: &SnapshotId) -> Option<&BackupSnapshot> {
        self.snapshots.get(id)
    }

    pub fn restore_context(&self, now: DateTime<Local>) -> Option<&RestoreContext> {
        self.restore.context(now)
    }

    /// Time left on the undo window timer
    pub fn restore_remaining(&self, now_mono: MonotonicInstant) -> Option<Duration> {
        self.restore.remaining(now_mono)
    }

    // Plans and records

    /// Set the plan for `date`. A total of zero removes the plan.
    pub fn set_plan(
        &mut self,
        date: NaiveDate,
        total_minutes: u32,
        now: DateTime<Local>,
    ) -> Vec<CoreEvent> {
        self.change_plan(date, total_minutes, source::PLAN, now)
    }

    pub fn delete_plan(&mut self, date: NaiveDate, now: DateTime<Local>) -> Vec<CoreEvent> {
        self.change_plan(date, 0, source::DELETE, now)
    }

    /// Add study time to `date`, accumulating into its single record
    pub fn add_record(
        &mut self,
        date: NaiveDate,
        minutes: u32,
        now: DateTime<Local>,
    ) -> Vec<CoreEvent> {
        let next = self.recorded_minutes(date).saturating_add(minutes);
        self.change_record(date, next, source::RECORD, now)
    }

    /// Replace the recorded time for `date`
    pub fn set_record(
        &mut self,
        date: NaiveDate,
        minutes: u32,
        now: DateTime<Local>,
    ) -> Vec<CoreEvent> {
        self.change_record(date, minutes, source::EDIT, now)
    }

    pub fn delete_record(&mut self, date: NaiveDate, now: DateTime<Local>) -> Vec<CoreEvent> {
        self.change_record(date, 0, source::DELETE, now)
    }

    fn change_plan(
        &mut self,
        date: NaiveDate,
        total_minutes: u32,
        source: &str,
        now: DateTime<Local>,
    ) -> Vec<CoreEvent> {
        let previous = self.plans.get(&date).map_or(0, PlanEntry::total_minutes);
        let next = total_minutes.min(MAX_MINUTES_PER_DAY);

        if next == 0 {
            self.plans.remove(&date);
        } else {
            self.plans.insert(date, PlanEntry::from_total(date, next));
        }

        self.commit_change(LogKind::Plan, date, previous, next, source, now)
    }

    fn change_record(
        &mut self,
        date: NaiveDate,
        minutes: u32,
        source: &str,
        now: DateTime<Local>,
    ) -> Vec<CoreEvent> {
        let previous = self.recorded_minutes(date);
        let next = minutes.min(MAX_MINUTES_PER_DAY);

        if next == 0 {
            self.records.remove(&date);
        } else {
            self.records.insert(date, next);
        }

        self.commit_change(LogKind::Actual, date, previous, next, source, now)
    }

    // One log entry and one snapshot per effective change; nothing otherwise.
    fn commit_change(
        &mut self,
        kind: LogKind,
        date: NaiveDate,
        previous: u32,
        next: u32,
        source: &str,
        now: DateTime<Local>,
    ) -> Vec<CoreEvent> {
        if self.log.append(kind, date, previous, next, source, now).is_none() {
            debug!(date = %date, kind = %kind, "Unchanged minutes, nothing logged");
            return Vec::new();
        }

        self.persist_live();

        let mut events = vec![CoreEvent::minutes_changed(kind, date, previous, next)];
        self.snapshot_live(None, now, &mut events);
        events
    }

    /// Clear the session log for one date
    pub fn clear_history(&mut self, date: NaiveDate, now: DateTime<Local>) -> Vec<CoreEvent> {
        let before = self.log.len();
        let removed = before - self.log.clear_for_date(date).len();
        if removed == 0 {
            return Vec::new();
        }

        self.persist_sessions();

        let mut events = vec![CoreEvent::HistoryCleared { date, removed }];
        self.snapshot_live(None, now, &mut events);
        events
    }

    // Backups

    /// Take a backup of the live state now
    pub fn backup_now(&mut self, note: Option<String>, now: DateTime<Local>) -> Vec<CoreEvent> {
        let note = note
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| MANUAL_BACKUP_NOTE.to_string());
        let mut events = Vec::new();
        self.snapshot_live(Some(note), now, &mut events);
        events
    }

    /// Delete one backup. An open undo window for it closes too.
    pub fn delete_backup(&mut self, id: &SnapshotId) -> Vec<CoreEvent> {
        if self.snapshots.get(id).is_none() {
            debug!(snapshot_id = %id, "Delete of unknown backup ignored");
            return Vec::new();
        }

        self.snapshots.delete_by_id(id);
        let mut events = vec![CoreEvent::BackupDeleted {
            snapshot_id: id.clone(),
        }];
        if self.restore.clear_if_backup(id) {
            events.push(CoreEvent::RestoreDismissed {
                backup_id: id.clone(),
            });
        }
        events
    }

    pub fn delete_all_backups(&mut self) -> Vec<CoreEvent> {
        let count = self.snapshots.len();
        self.snapshots.delete_all();

        let mut events = vec![CoreEvent::BackupsCleared { count }];
        if let Some(backup_id) = self.restore.clear() {
            events.push(CoreEvent::RestoreDismissed { backup_id });
        }
        events
    }

    // Restore

    /// Apply a backup over the live state and open the undo window
    pub fn restore(
        &mut self,
        backup_id: &SnapshotId,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Vec<CoreEvent> {
        let head = self.head_snapshot_id();
        let current = self.data();
        let Some(restored) =
            self.restore
                .restore(backup_id, current, &mut self.snapshots, now, now_mono)
        else {
            return Vec::new();
        };

        let mut events = Vec::new();
        self.push_snapshot_event(head, &mut events);

        self.replace_live(restored);
        self.persist_live();

        if let Some(context) = self.restore.context(now) {
            events.push(CoreEvent::RestoreApplied {
                backup_id: context.backup_id.clone(),
                expires_at: context.expires_at,
            });
        }
        events
    }

    /// Return to the state from before the active restore
    pub fn undo_restore(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        let head = self.head_snapshot_id();
        let Some((previous, backup_id)) = self.restore.undo(&mut self.snapshots, now) else {
            return Vec::new();
        };

        self.replace_live(previous);
        self.persist_live();

        let mut events = Vec::new();
        self.push_snapshot_event(head, &mut events);
        events.push(CoreEvent::RestoreUndone { backup_id });
        events
    }

    /// Keep the restored state and close the undo window
    pub fn dismiss_restore(&mut self, now: DateTime<Local>) -> Vec<CoreEvent> {
        self.restore
            .dismiss(now)
            .map(|backup_id| vec![CoreEvent::RestoreDismissed { backup_id }])
            .unwrap_or_default()
    }

    /// Drive the undo window timer
    pub fn tick(&mut self, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        self.restore
            .tick(now_mono)
            .map(|backup_id| vec![CoreEvent::RestoreExpired { backup_id }])
            .unwrap_or_default()
    }

    /// Re-read the persisted restore context so an undo, dismiss or restore
    /// made by another process is seen before the timer fires. Returns
    /// whether the undo window changed.
    pub fn sync_restore(&mut self, now: DateTime<Local>, now_mono: MonotonicInstant) -> bool {
        self.restore.sync(now, now_mono)
    }

    /// Whether some change has not reached the store yet
    pub fn has_unsaved(&self) -> bool {
        !self.unsaved.is_empty() || self.snapshots.is_unsaved() || self.restore.is_unsaved()
    }

    /// Retry writes that failed. Values already stored are not rewritten.
    pub fn flush(&mut self) {
        let pending: Vec<StoreKey> = self.unsaved.iter().copied().collect();
        for key in pending {
            match key {
                StoreKey::Records => self.persist_records(),
                StoreKey::Plans => self.persist_plans(),
                StoreKey::Sessions => self.persist_sessions(),
                StoreKey::Backups | StoreKey::RestoreContext => {}
            }
        }
        self.snapshots.flush();
        self.restore.flush();

        if self.has_unsaved() {
            warn!("Some changes could not be stored and remain in memory only");
        } else {
            debug!("Study engine flushed");
        }
    }

    // Internals

    fn replace_live(&mut self, data: StudyData) {
        self.records.clear();
        for record in data.records {
            let minutes = self.records.entry(record.date).or_insert(0);
            *minutes = (*minutes).saturating_add(record.minutes).min(MAX_MINUTES_PER_DAY);
        }
        self.records.retain(|_, minutes| *minutes > 0);

        self.plans.clear();
        for plan in data.plans {
            if plan.total_minutes() > 0 {
                self.plans.entry(plan.date).or_insert(plan);
            }
        }

        self.log = SessionLog::from_entries(data.sessions);
    }

    fn head_snapshot_id(&self) -> Option<SnapshotId> {
        self.snapshots.latest().map(|s| s.id.clone())
    }

    fn push_snapshot_event(&self, previous_head: Option<SnapshotId>, events: &mut Vec<CoreEvent>) {
        if let Some(latest) = self.snapshots.latest()
            && previous_head.as_ref() != Some(&latest.id)
        {
            events.push(CoreEvent::SnapshotCreated {
                snapshot_id: latest.id.clone(),
                note: latest.note.clone(),
            });
        }
    }

    fn snapshot_live(&mut self, note: Option<String>, now: DateTime<Local>, events: &mut Vec<CoreEvent>) {
        let head = self.head_snapshot_id();
        let data = self.data();
        self.snapshots.create_snapshot(&data, note, now);
        self.push_snapshot_event(head, events);
    }

    fn persist_live(&mut self) {
        self.persist_records();
        self.persist_plans();
        self.persist_sessions();
    }

    fn persist_records(&mut self) {
        let saved = write_value(self.store.as_ref(), StoreKey::Records, &self.records_vec());
        self.mark_saved(StoreKey::Records, saved);
    }

    fn persist_plans(&mut self) {
        let saved = write_value(self.store.as_ref(), StoreKey::Plans, &self.plans_vec());
        self.mark_saved(StoreKey::Plans, saved);
    }

    fn persist_sessions(&mut self) {
        let saved = write_value(self.store.as_ref(), StoreKey::Sessions, self.log.entries());
        self.mark_saved(StoreKey::Sessions, saved);
    }

    fn mark_saved(&mut self, key: StoreKey, saved: bool) {
        if saved {
            self.unsaved.remove(&key);
        } else {
            self.unsaved.insert(key);
        }
    }
}

fn read_value(store: &dyn Store, key: StoreKey) -> Option<Value> {
    match store.get(key) {
        Ok(Some(json)) => match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Stored value is not valid JSON");
                Some(Value::Null)
            }
        },
        Ok(None) => None,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read stored value");
            None
        }
    }
}

fn write_value<T: serde::Serialize + ?Sized>(store: &dyn Store, key: StoreKey, value: &T) -> bool {
    match put_json(store, key, value) {
        Ok(()) => true,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to persist, keeping change in memory");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use studycal_api::Band;
    use studycal_config::{BandTableKind, RatePolicy};
    use studycal_store::{MemoryStore, SqliteStore};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn engine_with(store: Arc<MemoryStore>) -> StudyEngine {
        StudyEngine::open_at(Settings::default(), store, now(), MonotonicInstant::now())
    }

    fn engine() -> StudyEngine {
        engine_with(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_plan_and_accumulated_records_rate_brown() {
        let mut engine = engine();
        let d = date("2025-03-01");

        engine.set_plan(d, 120, now());
        engine.add_record(d, 40, now());
        engine.add_record(d, 50, now());

        let result = engine.daily(d);
        assert_eq!(result.planned_minutes, 120);
        assert_eq!(result.actual_minutes, 90);
        assert_eq!(result.achievement_rate, 75);
        assert_eq!(engine.color_for(result.achievement_rate).band, Band::Brown);

        // One record for the date, not two
        assert_eq!(engine.data().records.len(), 1);
    }

    #[test]
    fn test_each_change_logs_once_and_snapshots_once() {
        let mut engine = engine();
        let d = date("2025-03-01");

        let events = engine.add_record(d, 30, now());
        assert!(matches!(events[0], CoreEvent::RecordChanged { previous_minutes: 0, minutes: 30, .. }));
        assert!(matches!(events[1], CoreEvent::SnapshotCreated { .. }));
        assert_eq!(engine.log().len(), 1);
        assert_eq!(engine.backups().len(), 1);

        // Same value again: no log, no snapshot
        assert!(engine.set_record(d, 30, now()).is_empty());
        assert_eq!(engine.log().len(), 1);
        assert_eq!(engine.backups().len(), 1);

        engine.set_record(d, 45, now());
        assert_eq!(engine.log().len(), 2);
        assert_eq!(engine.backups().len(), 2);
        assert_eq!(engine.backups()[0].records[0].minutes, 45);
    }

    #[test]
    fn test_records_cap_at_one_day() {
        let mut engine = engine();
        let d = date("2025-03-01");
        engine.add_record(d, 1000, now());
        engine.add_record(d, 1000, now());
        assert_eq!(engine.recorded_minutes(d), 1440);

        // Already at the cap: nothing changes
        assert!(engine.add_record(d, 10, now()).is_empty());
    }

    #[test]
    fn test_zero_plan_is_removed() {
        let mut engine = engine();
        let d = date("2025-03-01");
        engine.set_plan(d, 90, now());
        assert_eq!(engine.plan(d).map(|p| (p.hours, p.minutes)), Some((1, 30)));

        let events = engine.set_plan(d, 0, now());
        assert!(matches!(events[0], CoreEvent::PlanChanged { previous_minutes: 90, minutes: 0, .. }));
        assert!(engine.plan(d).is_none());

        assert!(engine.delete_plan(d, now()).is_empty());
    }

    #[test]
    fn test_delete_record_logs_source() {
        let mut engine = engine();
        let d = date("2025-03-01");
        engine.add_record(d, 30, now());
        engine.delete_record(d, now());

        assert_eq!(engine.recorded_minutes(d), 0);
        assert!(engine.data().records.is_empty());
        let history = engine.history(d);
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].source, source::DELETE);
        assert_eq!(history[1].minutes, 0);
    }

    #[test]
    fn test_range_queries_sum_then_rate() {
        let mut engine = engine();
        engine.set_plan(date("2025-03-03"), 30, now());
        engine.add_record(date("2025-03-03"), 30, now());
        engine.set_plan(date("2025-03-04"), 90, now());

        assert_eq!(engine.weekly(date("2025-03-05")).achievement_rate, 25);
        assert_eq!(engine.monthly(date("2025-03-31")).planned, 120);
        assert_eq!(engine.yearly(date("2025-12-31")).actual, 30);

        let range = DateRange {
            from: date("2025-03-04"),
            to: date("2025-03-04"),
        };
        assert_eq!(engine.custom(&range).achievement_rate, 0);
    }

    #[test]
    fn test_configured_variants() {
        let settings = Settings {
            rate_policy: RatePolicy::RewardEffort,
            band_table: BandTableKind::Legacy,
            ..Settings::default()
        };
        let mut engine = StudyEngine::open_at(
            settings,
            Arc::new(MemoryStore::new()),
            now(),
            MonotonicInstant::now(),
        );
        let d = date("2025-03-01");
        engine.add_record(d, 20, now());

        assert_eq!(engine.daily(d).achievement_rate, 100);
        assert_eq!(engine.color_for(125).band, Band::Brown);
    }

    #[test]
    fn test_clear_history_snapshots() {
        let mut engine = engine();
        let d = date("2025-03-01");
        engine.add_record(d, 30, now());
        engine.add_record(date("2025-03-02"), 10, now());

        let events = engine.clear_history(d, now());
        assert!(matches!(events[0], CoreEvent::HistoryCleared { removed: 1, .. }));
        assert!(matches!(events[1], CoreEvent::SnapshotCreated { .. }));
        assert!(engine.history(d).is_empty());
        assert_eq!(engine.log().len(), 1);
        assert_eq!(engine.recorded_minutes(d), 30);

        assert!(engine.clear_history(d, now()).is_empty());
    }

    #[test]
    fn test_backup_now_default_note_and_dedup() {
        let mut engine = engine();
        engine.add_record(date("2025-03-01"), 30, now());

        // Live state equals the latest snapshot already
        assert!(engine.backup_now(None, now()).is_empty());

        engine.delete_all_backups();
        let events = engine.backup_now(Some("  ".into()), now());
        assert!(matches!(
            &events[0],
            CoreEvent::SnapshotCreated { note: Some(n), .. } if n == MANUAL_BACKUP_NOTE
        ));
    }

    #[test]
    fn test_restore_and_undo_round_trip() {
        let mut engine = engine();
        let d = date("2025-03-01");
        let mono = MonotonicInstant::now();

        engine.set_plan(d, 120, now());
        let backup = engine.backups()[0].id.clone();
        engine.add_record(d, 90, now());
        let s0 = engine.data();

        let events = engine.restore(&backup, now(), mono);
        assert!(events.iter().any(|e| matches!(e, CoreEvent::RestoreApplied { .. })));
        assert_eq!(engine.recorded_minutes(d), 0);
        assert!(engine.restore_context(now()).is_some());

        let events = engine.undo_restore(now());
        assert!(events.iter().any(|e| matches!(e, CoreEvent::RestoreUndone { .. })));
        assert_eq!(engine.data(), s0);
        assert!(engine.restore_context(now()).is_none());
        assert!(engine.undo_restore(now()).is_empty());
    }

    #[test]
    fn test_restore_unknown_backup_is_noop() {
        let mut engine = engine();
        engine.add_record(date("2025-03-01"), 30, now());
        let before = engine.data();

        let events = engine.restore(&SnapshotId::from("nope"), now(), MonotonicInstant::now());
        assert!(events.is_empty());
        assert_eq!(engine.data(), before);
    }

    #[test]
    fn test_deleting_restored_backup_closes_window() {
        let mut engine = engine();
        let d = date("2025-03-01");
        engine.add_record(d, 30, now());
        let backup = engine.backups()[0].id.clone();
        engine.add_record(d, 30, now());

        engine.restore(&backup, now(), MonotonicInstant::now());
        let events = engine.delete_backup(&backup);
        assert_eq!(events.len(), 2);
        assert!(engine.restore_context(now()).is_none());
        assert!(engine.undo_restore(now()).is_empty());
    }

    #[test]
    fn test_delete_all_backups_closes_window() {
        let mut engine = engine();
        let d = date("2025-03-01");
        engine.add_record(d, 30, now());
        let backup = engine.backups()[0].id.clone();
        engine.add_record(d, 30, now());
        engine.restore(&backup, now(), MonotonicInstant::now());

        engine.delete_all_backups();
        assert!(engine.backups().is_empty());
        assert!(engine.restore_context(now()).is_none());
    }

    #[test]
    fn test_tick_expires_window() {
        let mut engine = engine();
        let d = date("2025-03-01");
        let mono = MonotonicInstant::now();
        engine.add_record(d, 30, now());
        let backup = engine.backups()[0].id.clone();
        engine.add_record(d, 30, now());
        engine.restore(&backup, now(), mono);

        assert!(engine.tick(mono).is_empty());
        let events = engine.tick(mono + engine.settings().undo_window);
        assert_eq!(events, vec![CoreEvent::RestoreExpired { backup_id: backup }]);
        assert!(engine.undo_restore(now()).is_empty());
    }

    #[test]
    fn test_reopen_loads_persisted_state() {
        let store = Arc::new(MemoryStore::new());
        let d = date("2025-03-01");
        {
            let mut engine = engine_with(store.clone());
            engine.set_plan(d, 60, now());
            engine.add_record(d, 30, now());
            engine.flush();
        }

        let engine = engine_with(store);
        assert_eq!(engine.daily(d).achievement_rate, 50);
        assert_eq!(engine.log().len(), 2);
        assert_eq!(engine.log()[0].kind, LogKind::Actual);
        assert_eq!(engine.backups().len(), 2);
        assert!(engine.integrity().is_clean());
    }

    #[test]
    fn test_sqlite_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studycal.db");
        let d = date("2025-03-01");

        {
            let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&path).unwrap());
            let mut engine =
                StudyEngine::open_at(Settings::default(), store, now(), MonotonicInstant::now());
            engine.set_plan(d, 120, now());
            engine.add_record(d, 90, now());
        }

        let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&path).unwrap());
        let engine =
            StudyEngine::open_at(Settings::default(), store, now(), MonotonicInstant::now());
        assert_eq!(engine.daily(d).achievement_rate, 75);
        assert_eq!(engine.history(d).len(), 2);
    }

    #[test]
    fn test_open_repairs_corrupt_data() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                StoreKey::Records,
                r#"[{"date":"2025-03-01","minutes":9000},{"date":"bad","minutes":1}]"#,
            )
            .unwrap();
        store.set(StoreKey::Plans, "not json").unwrap();

        let engine = engine_with(store.clone());
        assert_eq!(engine.recorded_minutes(date("2025-03-01")), 1440);
        assert_eq!(engine.integrity().dropped_records, 1);
        assert_eq!(engine.integrity().invalid_collections, vec!["plans"]);

        // Repaired data is written back
        let plans = store.get(StoreKey::Plans).unwrap().unwrap();
        assert_eq!(plans, "[]");
    }

    #[test]
    fn test_write_failures_degrade_to_memory() {
        let store = Arc::new(MemoryStore::new());
        let mut engine = engine_with(store.clone());
        store.set_fail_writes(true);

        let d = date("2025-03-01");
        engine.add_record(d, 30, now());
        assert_eq!(engine.recorded_minutes(d), 30);
        assert_eq!(engine.backups().len(), 1);
        assert!(!engine.store_healthy());
        assert!(engine.has_unsaved());

        store.set_fail_writes(false);
        engine.flush();
        assert!(!engine.has_unsaved());

        let reopened = engine_with(store);
        assert_eq!(reopened.recorded_minutes(d), 30);
        assert_eq!(reopened.backups().len(), 1);
    }

    #[test]
    fn test_flush_does_not_overwrite_undo_from_another_engine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("studycal.db");
        let open = || -> StudyEngine {
            let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&path).unwrap());
            StudyEngine::open_at(Settings::default(), store, now(), MonotonicInstant::now())
        };
        let d = date("2025-03-01");

        let backup = {
            let mut engine = open();
            engine.add_record(d, 10, now());
            let backup = engine.backups()[0].id.clone();
            engine.set_record(d, 45, now());
            engine.restore(&backup, now(), MonotonicInstant::now());
            engine.flush();
            backup
        };

        let mut watcher = open();
        assert_eq!(watcher.restore_context(now()).unwrap().backup_id, backup);

        {
            let mut engine = open();
            assert!(!engine.undo_restore(now()).is_empty());
            engine.flush();
            assert_eq!(engine.recorded_minutes(d), 45);
        }

        assert!(watcher.sync_restore(now(), MonotonicInstant::now()));
        assert!(watcher.tick(MonotonicInstant::now() + watcher.settings().undo_window).is_empty());
        watcher.flush();

        let engine = open();
        assert_eq!(engine.recorded_minutes(d), 45);
        assert!(engine.restore_context(now()).is_none());
    }

    #[test]
    fn test_undo_of_corrupt_persisted_context_is_sanitized() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                StoreKey::RestoreContext,
                r#"{
                    "previousRecords": [],
                    "previousPlans": [{"date": "2025-03-01", "hours": 100000000, "minutes": 0}],
                    "backupId": "backup-1",
                    "appliedAt": "2025-03-01T12:00:00+00:00",
                    "expiresAt": "2099-01-01T00:00:00+00:00"
                }"#,
            )
            .unwrap();

        let mut engine = engine_with(store);
        assert!(engine.restore_context(now()).is_some());

        let events = engine.undo_restore(now());
        assert!(events.contains(&CoreEvent::RestoreUndone {
            backup_id: SnapshotId::from("backup-1")
        }));
        assert_eq!(
            engine.plan(date("2025-03-01")).map(PlanEntry::total_minutes),
            Some(MAX_MINUTES_PER_DAY)
        );
    }
}
