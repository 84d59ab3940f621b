//! Text and JSON rendering of command results

use anyhow::Result;
use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use studycal_api::{
    AchievementResult, BackupSnapshot, DateRange, RangeStats, RestoreContext, SessionLogEntry,
    VisualToken,
};
use studycal_core::{CoreEvent, IntegrityReport};
use studycal_util::{format_datetime_full, format_duration, format_minutes};

/// Writes results to stdout, as text or as JSON
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    pub fn events(&self, events: &[CoreEvent]) -> Result<()> {
        if self.json {
            return self.print_json(events);
        }
        if events.is_empty() {
            println!("No changes");
        }
        for event in events {
            println!("{}", describe_event(event));
        }
        Ok(())
    }

    pub fn day(&self, result: &AchievementResult, token: &VisualToken) -> Result<()> {
        if self.json {
            return self.print_json(&json!({ "result": result, "color": token }));
        }
        println!(
            "{}  plan {:>8}  actual {:>8}  {:>4}%  {} ({})",
            result.date,
            format_minutes(result.planned_minutes),
            format_minutes(result.actual_minutes),
            result.achievement_rate,
            token.band,
            token.background,
        );
        Ok(())
    }

    pub fn range(
        &self,
        label: &str,
        range: &DateRange,
        stats: &RangeStats,
        token: &VisualToken,
    ) -> Result<()> {
        if self.json {
            return self.print_json(&json!({
                "period": label,
                "range": range,
                "stats": stats,
                "color": token,
            }));
        }
        println!(
            "{} {}..{}  plan {}  actual {}  {}%  {}",
            label,
            range.from,
            range.to,
            format_total(stats.planned),
            format_total(stats.actual),
            stats.achievement_rate,
            token.band,
        );
        Ok(())
    }

    pub fn log(&self, entries: &[SessionLogEntry]) -> Result<()> {
        if self.json {
            return self.print_json(entries);
        }
        if entries.is_empty() {
            println!("No log entries");
        }
        for entry in entries {
            println!(
                "{}  {}  {:<6} {:>8} -> {:<8} ({:+})  {}",
                format_datetime_full(&entry.recorded_at),
                entry.date,
                entry.kind.as_str(),
                format_minutes(entry.previous_minutes),
                format_minutes(entry.minutes),
                entry.delta(),
                entry.source,
            );
        }
        Ok(())
    }

    pub fn backups(&self, backups: &[BackupSnapshot]) -> Result<()> {
        if self.json {
            return self.print_json(backups);
        }
        if backups.is_empty() {
            println!("No backups");
        }
        for backup in backups {
            println!(
                "{}  {}  {} records, {} plans, {} log entries  {}",
                backup.id,
                format_datetime_full(&backup.created_at),
                backup.records.len(),
                backup.plans.len(),
                backup.sessions.len(),
                backup.note.as_deref().unwrap_or(""),
            );
        }
        Ok(())
    }

    pub fn status(&self, status: &Status<'_>) -> Result<()> {
        if self.json {
            return self.print_json(&json!({
                "backups": status.backups,
                "maxBackups": status.max_backups,
                "storeHealthy": status.store_healthy,
                "restore": status.restore,
                "restoreRemainingSecs": status.remaining.map(|d| d.as_secs()),
                "repaired": !status.integrity.is_clean(),
                "mockTime": status.mock_time,
            }));
        }

        if status.mock_time {
            println!("Clock: mock time active");
        }

        println!("Backups: {}/{}", status.backups, status.max_backups);
        println!(
            "Store: {}",
            if status.store_healthy { "healthy" } else { "degraded" }
        );
        match status.restore {
            Some(context) => println!(
                "Restore: backup {} applied {}, undo available for {}",
                context.backup_id,
                format_datetime_full(&context.applied_at),
                format_duration(status.remaining.unwrap_or_default()),
            ),
            None => println!("Restore: none"),
        }
        if !status.integrity.is_clean() {
            println!(
                "Repaired on load: {} dropped, {} merged",
                status.integrity.total_dropped(),
                status.integrity.merged_records
            );
        }
        Ok(())
    }
}

/// Inputs for the `status` command
pub struct Status<'a> {
    pub backups: usize,
    pub max_backups: usize,
    pub store_healthy: bool,
    pub restore: Option<&'a RestoreContext>,
    pub remaining: Option<Duration>,
    pub integrity: &'a IntegrityReport,
    pub mock_time: bool,
}

fn format_total(minutes: u64) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours > 0 {
        format!("{}h {:02}m", hours, rest)
    } else {
        format!("{}m", rest)
    }
}

fn format_expiry(at: &DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}

pub fn describe_event(event: &CoreEvent) -> String {
    match event {
        CoreEvent::PlanChanged {
            date,
            previous_minutes,
            minutes,
        } => format!(
            "Plan {}: {} -> {}",
            date,
            format_minutes(*previous_minutes),
            format_minutes(*minutes)
        ),
        CoreEvent::RecordChanged {
            date,
            previous_minutes,
            minutes,
        } => format!(
            "Record {}: {} -> {}",
            date,
            format_minutes(*previous_minutes),
            format_minutes(*minutes)
        ),
        CoreEvent::HistoryCleared { date, removed } => {
            format!("Cleared {} log entries for {}", removed, date)
        }
        CoreEvent::SnapshotCreated { snapshot_id, note } => match note {
            Some(note) => format!("Backup {} created ({})", snapshot_id, note),
            None => format!("Backup {} created", snapshot_id),
        },
        CoreEvent::BackupDeleted { snapshot_id } => format!("Backup {} deleted", snapshot_id),
        CoreEvent::BackupsCleared { count } => format!("Deleted {} backups", count),
        CoreEvent::RestoreApplied {
            backup_id,
            expires_at,
        } => format!(
            "Restored backup {}. Undo available until {}",
            backup_id,
            format_expiry(expires_at)
        ),
        CoreEvent::RestoreUndone { backup_id } => {
            format!("Restore of backup {} undone", backup_id)
        }
        CoreEvent::RestoreDismissed { backup_id } => {
            format!("Restore of backup {} kept; undo closed", backup_id)
        }
        CoreEvent::RestoreExpired { backup_id } => {
            format!("Undo window for backup {} expired", backup_id)
        }
    }
}
