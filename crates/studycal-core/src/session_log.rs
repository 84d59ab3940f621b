//! Append-only audit log of minute changes

use chrono::{DateTime, Local, NaiveDate};
use studycal_api::{LogKind, SessionLogEntry};
use studycal_util::LogEntryId;
use tracing::debug;

/// Session log held newest-first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionLog {
    entries: Vec<SessionLogEntry>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap entries that are already newest-first (as persisted)
    pub fn from_entries(entries: Vec<SessionLogEntry>) -> Self {
        Self { entries }
    }

    /// All entries, newest first
    pub fn entries(&self) -> &[SessionLogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a change from `previous` to `next` minutes.
    ///
    /// Returns `None` and leaves the log untouched when nothing changed.
    pub fn append(
        &mut self,
        kind: LogKind,
        date: NaiveDate,
        previous: u32,
        next: u32,
        source: &str,
        now: DateTime<Local>,
    ) -> Option<SessionLogEntry> {
        if previous == next {
            return None;
        }

        let entry = SessionLogEntry {
            id: LogEntryId::new(),
            date,
            kind,
            previous_minutes: previous,
            minutes: next,
            recorded_at: now,
            source: source.to_string(),
        };

        debug!(
            date = %date,
            kind = %kind,
            previous,
            next,
            source,
            "Session log entry appended"
        );

        self.entries.insert(0, entry.clone());
        Some(entry)
    }

    /// Entries for one date in creation order (oldest first)
    pub fn entries_for_date(&self, date: NaiveDate) -> Vec<SessionLogEntry> {
        let mut entries: Vec<SessionLogEntry> = self
            .entries
            .iter()
            .filter(|e| e.date == date)
            .cloned()
            .collect();
        // Storage order is newest-first; flip before the stable sort so
        // entries sharing a timestamp keep the order they were appended in.
        entries.reverse();
        entries.sort_by_key(|e| e.recorded_at);
        entries
    }

    /// Drop every entry for `date` and return what remains
    pub fn clear_for_date(&mut self, date: NaiveDate) -> &[SessionLogEntry] {
        let before = self.entries.len();
        self.entries.retain(|e| e.date != date);
        debug!(date = %date, removed = before - self.entries.len(), "Session log cleared for date");
        &self.entries
    }
}
