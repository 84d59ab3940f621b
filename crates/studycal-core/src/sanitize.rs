//! Sanitization of snapshot data and repair of persisted collections

use chrono::{DateTime, Local, NaiveDate};
use serde_json::Value;
use std::collections::HashMap;
use studycal_api::{ActualRecord, LogKind, PlanEntry, SessionLogEntry, StudyData};
use studycal_util::{clamp_minutes, LogEntryId, MAX_MINUTES_PER_DAY};
use tracing::warn;

use crate::parse_iso_date;

pub fn sanitize_record(record: &ActualRecord) -> ActualRecord {
    ActualRecord {
        date: record.date,
        minutes: record.minutes.min(MAX_MINUTES_PER_DAY),
    }
}

/// Clamp the plan total to one day and re-split it into hours and minutes
pub fn sanitize_plan(plan: &PlanEntry) -> PlanEntry {
    let total = u64::from(plan.hours) * 60 + u64::from(plan.minutes);
    let total = total.min(u64::from(MAX_MINUTES_PER_DAY)) as u32;
    PlanEntry::from_total(plan.date, total)
}

pub fn sanitize_session(entry: &SessionLogEntry) -> SessionLogEntry {
    SessionLogEntry {
        previous_minutes: entry.previous_minutes.min(MAX_MINUTES_PER_DAY),
        minutes: entry.minutes.min(MAX_MINUTES_PER_DAY),
        ..entry.clone()
    }
}

/// Sanitize every element and collapse duplicate dates.
///
/// Duplicate records are summed (capped at one day); for duplicate plans
/// the first one wins.
pub fn sanitize_data(data: &StudyData) -> StudyData {
    StudyData {
        records: merge_records(data.records.iter().map(sanitize_record)).0,
        plans: dedup_plans(data.plans.iter().map(sanitize_plan)),
        sessions: data.sessions.iter().map(sanitize_session).collect(),
    }
}

fn merge_records(records: impl Iterator<Item = ActualRecord>) -> (Vec<ActualRecord>, usize) {
    let mut merged: Vec<ActualRecord> = Vec::new();
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();
    let mut collapsed = 0;

    for record in records {
        match index.get(&record.date) {
            Some(&i) => {
                let existing = &mut merged[i];
                existing.minutes = (existing.minutes + record.minutes).min(MAX_MINUTES_PER_DAY);
                collapsed += 1;
            }
            None => {
                index.insert(record.date, merged.len());
                merged.push(record);
            }
        }
    }

    (merged, collapsed)
}

fn dedup_plans(plans: impl Iterator<Item = PlanEntry>) -> Vec<PlanEntry> {
    let mut seen = std::collections::HashSet::new();
    plans.filter(|p| seen.insert(p.date)).collect()
}

/// What a repair pass had to change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    pub dropped_records: usize,
    pub dropped_plans: usize,
    pub dropped_sessions: usize,
    /// Records folded into an earlier record for the same date
    pub merged_records: usize,
    /// Collections whose stored value was not a JSON array
    pub invalid_collections: Vec<&'static str>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.total_dropped() == 0 && self.merged_records == 0 && self.invalid_collections.is_empty()
    }

    pub fn total_dropped(&self) -> usize {
        self.dropped_records + self.dropped_plans + self.dropped_sessions
    }
}

fn field_date(obj: &serde_json::Map<String, Value>) -> Option<NaiveDate> {
    obj.get("date").and_then(Value::as_str).and_then(parse_iso_date)
}

fn field_number(obj: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(Value::as_f64).filter(|n| n.is_finite())
}

fn repair_record(value: &Value) -> Option<ActualRecord> {
    let obj = value.as_object()?;
    let Some(date) = field_date(obj) else {
        warn!(date = ?obj.get("date"), "Invalid record date, skipping");
        return None;
    };
    let Some(minutes) = field_number(obj, "minutes") else {
        warn!(minutes = ?obj.get("minutes"), "Invalid record minutes, skipping");
        return None;
    };

    Some(ActualRecord {
        date,
        minutes: clamp_minutes(minutes, MAX_MINUTES_PER_DAY),
    })
}

fn repair_plan(value: &Value) -> Option<PlanEntry> {
    let obj = value.as_object()?;
    let Some(date) = field_date(obj) else {
        warn!(date = ?obj.get("date"), "Invalid plan date, skipping");
        return None;
    };
    let (Some(hours), Some(minutes)) = (field_number(obj, "hours"), field_number(obj, "minutes"))
    else {
        warn!(date = %date, "Invalid plan duration, skipping");
        return None;
    };

    let total = hours.round() * 60.0 + minutes.round();
    Some(PlanEntry::from_total(
        date,
        clamp_minutes(total, MAX_MINUTES_PER_DAY),
    ))
}

fn repair_session(value: &Value, now: DateTime<Local>) -> Option<SessionLogEntry> {
    let obj = value.as_object()?;
    let Some(date) = field_date(obj) else {
        warn!(date = ?obj.get("date"), "Invalid session log date, skipping");
        return None;
    };

    let kind = match obj.get("kind").and_then(Value::as_str) {
        Some("plan") => LogKind::Plan,
        _ => LogKind::Actual,
    };
    let minutes_field = |key: &str| {
        field_number(obj, key)
            .map(|n| clamp_minutes(n, MAX_MINUTES_PER_DAY))
            .unwrap_or(0)
    };
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .map(LogEntryId::from)
        .unwrap_or_default();
    let recorded_at = obj
        .get("recordedAt")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Local))
        .unwrap_or(now);
    let source = obj
        .get("source")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(SessionLogEntry {
        id,
        date,
        kind,
        previous_minutes: minutes_field("previousMinutes"),
        minutes: minutes_field("minutes"),
        recorded_at,
        source,
    })
}

fn repair_array<T>(
    name: &'static str,
    value: Option<&Value>,
    report: &mut IntegrityReport,
    mut repair: impl FnMut(&Value) -> Option<T>,
) -> (Vec<T>, usize) {
    let Some(value) = value else {
        return (Vec::new(), 0);
    };
    let Some(items) = value.as_array() else {
        warn!(collection = name, "Stored collection is not an array, using empty");
        report.invalid_collections.push(name);
        return (Vec::new(), 0);
    };

    let repaired: Vec<T> = items.iter().filter_map(&mut repair).collect();
    let dropped = items.len() - repaired.len();
    (repaired, dropped)
}

/// Rebuild live data from untyped persisted values.
///
/// `None` means nothing was stored and is not an error. Elements that
/// cannot be read are dropped; numbers are rounded and clamped.
pub fn repair_data(
    records: Option<&Value>,
    plans: Option<&Value>,
    sessions: Option<&Value>,
    now: DateTime<Local>,
) -> (StudyData, IntegrityReport) {
    let mut report = IntegrityReport::default();

    let (records, dropped) = repair_array("records", records, &mut report, repair_record);
    report.dropped_records = dropped;
    let (records, merged) = merge_records(records.into_iter());
    report.merged_records = merged;

    let (plans, dropped) = repair_array("plans", plans, &mut report, repair_plan);
    report.dropped_plans = dropped;
    let plans = dedup_plans(plans.into_iter());

    let (sessions, dropped) =
        repair_array("sessions", sessions, &mut report, |v| repair_session(v, now));
    report.dropped_sessions = dropped;

    if !report.is_clean() {
        warn!(
            dropped = report.total_dropped(),
            merged = report.merged_records,
            invalid = ?report.invalid_collections,
            "Repaired stored study data"
        );
    }

    (
        StudyData {
            records,
            plans,
            sessions,
        },
        report,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_sanitize_clamps_and_resplits() {
        let record = ActualRecord { date: date("2025-03-01"), minutes: 5000 };
        assert_eq!(sanitize_record(&record).minutes, 1440);

        let plan = PlanEntry { date: date("2025-03-01"), hours: 1, minutes: 90 };
        let plan = sanitize_plan(&plan);
        assert_eq!((plan.hours, plan.minutes), (2, 30));

        let plan = PlanEntry { date: date("2025-03-01"), hours: 30, minutes: 0 };
        assert_eq!(sanitize_plan(&plan).total_minutes(), 1440);
    }

    #[test]
    fn test_sanitize_session_clamps_minutes() {
        let entry = SessionLogEntry {
            id: LogEntryId::new(),
            date: date("2025-03-01"),
            kind: LogKind::Plan,
            previous_minutes: 2000,
            minutes: 3000,
            recorded_at: now(),
            source: "import".into(),
        };
        let clean = sanitize_session(&entry);
        assert_eq!(clean.previous_minutes, 1440);
        assert_eq!(clean.minutes, 1440);
        assert_eq!(clean.id, entry.id);
        assert_eq!(clean.kind, LogKind::Plan);
    }

    #[test]
    fn test_sanitize_data_collapses_duplicates() {
        let d = date("2025-03-01");
        let data = StudyData {
            records: vec![
                ActualRecord { date: d, minutes: 1000 },
                ActualRecord { date: d, minutes: 1000 },
            ],
            plans: vec![
                PlanEntry { date: d, hours: 1, minutes: 0 },
                PlanEntry { date: d, hours: 3, minutes: 0 },
            ],
            sessions: vec![],
        };
        let clean = sanitize_data(&data);
        assert_eq!(clean.records, vec![ActualRecord { date: d, minutes: 1440 }]);
        assert_eq!(clean.plans.len(), 1);
        assert_eq!(clean.plans[0].total_minutes(), 60);
    }

    #[test]
    fn test_repair_drops_invalid_elements() {
        let records = json!([
            {"date": "2025-03-01", "minutes": 40.6},
            {"date": "2025-3-1", "minutes": 10},
            {"date": "2025-03-02", "minutes": "ten"},
            {"date": "2025-03-03", "minutes": -20},
            {"date": "2025-03-04", "minutes": 99999},
            "garbage"
        ]);
        let (data, report) = repair_data(Some(&records), None, None, now());

        assert_eq!(report.dropped_records, 3);
        assert_eq!(data.records.len(), 3);
        assert_eq!(data.records[0].minutes, 41);
        assert_eq!(data.records[1].minutes, 0);
        assert_eq!(data.records[2].minutes, 1440);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_repair_plans_normalizes_split() {
        let plans = json!([
            {"date": "2025-03-01", "hours": 1, "minutes": 75},
            {"date": "2025-03-02", "hours": 30, "minutes": 0},
            {"date": "2025-03-03", "hours": 1},
            {"date": "2025-03-01", "hours": 5, "minutes": 0}
        ]);
        let (data, report) = repair_data(None, Some(&plans), None, now());

        assert_eq!(report.dropped_plans, 1);
        assert_eq!(data.plans.len(), 2);
        assert_eq!((data.plans[0].hours, data.plans[0].minutes), (2, 15));
        assert_eq!(data.plans[1].total_minutes(), 1440);
    }

    #[test]
    fn test_repair_merges_duplicate_record_dates() {
        let records = json!([
            {"date": "2025-03-01", "minutes": 40},
            {"date": "2025-03-01", "minutes": 50}
        ]);
        let (data, report) = repair_data(Some(&records), None, None, now());
        assert_eq!(data.records, vec![ActualRecord { date: date("2025-03-01"), minutes: 90 }]);
        assert_eq!(report.merged_records, 1);
    }

    #[test]
    fn test_repair_non_array_is_empty() {
        let bogus = json!({"records": []});
        let (data, report) = repair_data(Some(&bogus), Some(&Value::Null), None, now());

        assert!(data.is_empty());
        assert_eq!(report.invalid_collections, vec!["records", "plans"]);
    }

    #[test]
    fn test_repair_missing_collections_is_clean() {
        let (data, report) = repair_data(None, None, None, now());
        assert!(data.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn test_repair_sessions_coerces_fields() {
        let sessions = json!([
            {
                "id": "log-1",
                "date": "2025-03-01",
                "kind": "weird",
                "previousMinutes": 30,
                "minutes": 5000,
                "recordedAt": "2025-03-01T09:00:00+00:00",
                "source": "record"
            },
            {"date": "2025-03-02", "kind": "plan"},
            {"kind": "plan", "minutes": 10}
        ]);
        let (data, report) = repair_data(None, None, Some(&sessions), now());

        assert_eq!(report.dropped_sessions, 1);
        let first = &data.sessions[0];
        assert_eq!(first.id.as_str(), "log-1");
        assert_eq!(first.kind, LogKind::Actual);
        assert_eq!(first.minutes, 1440);
        assert_eq!(first.previous_minutes, 30);

        let second = &data.sessions[1];
        assert_eq!(second.kind, LogKind::Plan);
        assert_eq!(second.minutes, 0);
        assert_eq!(second.recorded_at, now());
        assert!(second.id.as_str().starts_with("log-"));
    }
}
