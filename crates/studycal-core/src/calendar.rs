//! Calendar date enumeration

use chrono::{Datelike, Days, Months, NaiveDate};
use studycal_api::DateRange;

/// Every calendar date in `[from, to]`, in order. Empty when `from > to`.
pub fn dates_inclusive(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days().take_while(|d| *d <= to).collect()
}

/// All dates covered by `range`
pub fn dates_in(range: &DateRange) -> Vec<NaiveDate> {
    dates_inclusive(range.from, range.to)
}

/// Monday of the ISO week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Monday through Sunday of the week containing `date`
pub fn week_bounds(date: NaiveDate) -> DateRange {
    let from = week_start(date);
    DateRange {
        from,
        to: from + Days::new(6),
    }
}

/// First through last day of the month containing `date`
pub fn month_bounds(date: NaiveDate) -> DateRange {
    let from = date - Days::new(u64::from(date.day0()));
    let to = from
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX);
    DateRange { from, to }
}

/// January 1st through December 31st of the year containing `date`
pub fn year_bounds(date: NaiveDate) -> DateRange {
    let from = date - Days::new(u64::from(date.ordinal0()));
    let to = NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(NaiveDate::MAX);
    DateRange { from, to }
}
