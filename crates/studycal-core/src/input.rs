//! Validation of raw user input
//!
//! Everything here runs before a value reaches the engine. Errors are
//! `StudycalError::ValidationError` with a message fit for the user.

use chrono::NaiveDate;
use studycal_api::DateRange;
use studycal_util::{
    Result, StudycalError, MAX_MINUTES_PER_DAY, MAX_PLAN_HOURS, MAX_PLAN_MINUTES,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Strict `YYYY-MM-DD` parse after trimming; `None` on any deviation
pub fn parse_iso_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() != 10 {
        return None;
    }

    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).ok()
}

/// Parse a user-supplied date
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    parse_iso_date(input).ok_or_else(|| {
        StudycalError::validation(format!(
            "Invalid date '{}'. Expected YYYY-MM-DD",
            input.trim()
        ))
    })
}

/// Validate a planned duration and return its total in minutes.
///
/// 24h with extra minutes is accepted and capped at one day.
pub fn validate_plan(hours: i64, minutes: i64) -> Result<u32> {
    if !(0..=i64::from(MAX_PLAN_HOURS)).contains(&hours) {
        return Err(StudycalError::validation(format!(
            "Hours must be between 0 and {}",
            MAX_PLAN_HOURS
        )));
    }
    if !(0..=i64::from(MAX_PLAN_MINUTES)).contains(&minutes) {
        return Err(StudycalError::validation(format!(
            "Minutes must be between 0 and {}",
            MAX_PLAN_MINUTES
        )));
    }

    let total = hours * 60 + minutes;
    Ok(total.min(i64::from(MAX_MINUTES_PER_DAY)) as u32)
}

/// Validate a recorded duration in minutes
pub fn validate_record_minutes(minutes: i64) -> Result<u32> {
    if minutes < 0 {
        return Err(StudycalError::validation("Minutes cannot be negative"));
    }
    if minutes > i64::from(MAX_MINUTES_PER_DAY) {
        return Err(StudycalError::validation(
            "Study time cannot exceed 24 hours per day",
        ));
    }
    Ok(minutes as u32)
}

/// Build an inclusive range, rejecting `from > to`
pub fn date_range(from: NaiveDate, to: NaiveDate) -> Result<DateRange> {
    DateRange::new(from, to)
}

pub fn parse_date_range(from: &str, to: &str) -> Result<DateRange> {
    date_range(parse_date(from)?, parse_date(to)?)
}
