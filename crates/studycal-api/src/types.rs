//! Plan, record and log types

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use studycal_util::{from_minutes, to_minutes, LogEntryId};
use std::fmt;

/// Planned study time for one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub date: NaiveDate,
    pub hours: u32,
    pub minutes: u32,
}

impl PlanEntry {
    /// Build a plan from total minutes, normalized to hours + minutes
    pub fn from_total(date: NaiveDate, total_minutes: u32) -> Self {
        let (hours, minutes) = from_minutes(total_minutes);
        Self {
            date,
            hours,
            minutes,
        }
    }

    pub fn total_minutes(&self) -> u32 {
        to_minutes(self.hours, self.minutes)
    }
}

/// Actual study time logged for one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualRecord {
    pub date: NaiveDate,
    pub minutes: u32,
}

/// Which value a log entry changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Plan,
    #[default]
    Actual,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Plan => "plan",
            LogKind::Actual => "actual",
        }
    }
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Anything other than "plan" is read as an actual-time change.
impl<'de> Deserialize<'de> for LogKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == "plan" {
            LogKind::Plan
        } else {
            LogKind::Actual
        })
    }
}

/// Audit record of one minute change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLogEntry {
    #[serde(default)]
    pub id: LogEntryId,
    pub date: NaiveDate,
    #[serde(default)]
    pub kind: LogKind,
    #[serde(default)]
    pub previous_minutes: u32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default = "unknown_recorded_at")]
    pub recorded_at: DateTime<Local>,
    #[serde(default)]
    pub source: String,
}

// Entries stored without a timestamp sort before everything else.
fn unknown_recorded_at() -> DateTime<Local> {
    DateTime::<Utc>::UNIX_EPOCH.with_timezone(&Local)
}

impl SessionLogEntry {
    /// Signed change this entry applied
    pub fn delta(&self) -> i64 {
        i64::from(self.minutes) - i64::from(self.previous_minutes)
    }
}

/// Achievement for a single date. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementResult {
    pub date: NaiveDate,
    pub planned_minutes: u32,
    pub actual_minutes: u32,
    pub achievement_rate: u32,
}

/// Aggregated achievement over a set of dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeStats {
    pub planned: u64,
    pub actual: u64,
    pub achievement_rate: u32,
}

/// Inclusive calendar range. `from <= to` is checked by whoever builds one
/// from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Inclusive range; `from > to` is a validation error
    pub fn new(from: NaiveDate, to: NaiveDate) -> studycal_util::Result<Self> {
        if from > to {
            return Err(studycal_util::StudycalError::validation(format!(
                "Range start {} is after range end {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }
}

/// Live study data: the triple that snapshots copy
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StudyData {
    pub records: Vec<ActualRecord>,
    pub plans: Vec<PlanEntry>,
    pub sessions: Vec<SessionLogEntry>,
}

impl StudyData {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.plans.is_empty() && self.sessions.is_empty()
    }
}
