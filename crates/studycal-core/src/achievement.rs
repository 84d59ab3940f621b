//! Achievement calculation
//!
//! All functions here are pure. A range is rated by summing planned and
//! actual minutes over every date first and applying the rate formula once
//! to the sums; per-day rates are never averaged.

use chrono::NaiveDate;
use std::collections::HashMap;
use studycal_api::{AchievementResult, ActualRecord, DateRange, PlanEntry, RangeStats};
use studycal_config::RatePolicy;

use crate::calendar::{dates_in, month_bounds, week_bounds, year_bounds};

/// Canonical achievement rate: `round(actual / planned * 100)`, and 0 when
/// nothing was planned. Never negative, not capped at 100.
pub fn achievement_rate(planned: u64, actual: u64) -> u32 {
    rate_with_policy(RatePolicy::Strict, planned, actual)
}

/// Achievement rate under an explicit no-plan policy
pub fn rate_with_policy(policy: RatePolicy, planned: u64, actual: u64) -> u32 {
    if planned == 0 {
        return match policy {
            RatePolicy::Strict => 0,
            RatePolicy::RewardEffort if actual > 0 => 100,
            RatePolicy::RewardEffort => 0,
        };
    }

    // Round half up in integer arithmetic: floor(100a/p + 1/2)
    let rate = (actual.saturating_mul(200).saturating_add(planned)) / planned.saturating_mul(2);
    u32::try_from(rate).unwrap_or(u32::MAX)
}

/// Planned and actual minutes per date
#[derive(Debug, Default)]
struct DayIndex {
    planned: HashMap<NaiveDate, u32>,
    actual: HashMap<NaiveDate, u32>,
}

impl DayIndex {
    fn build(records: &[ActualRecord], plans: &[PlanEntry]) -> Self {
        let mut index = Self::default();
        for record in records {
            *index.actual.entry(record.date).or_default() += record.minutes;
        }
        for plan in plans {
            // First plan for a date wins
            index.planned.entry(plan.date).or_insert(plan.total_minutes());
        }
        index
    }

    fn planned(&self, date: NaiveDate) -> u32 {
        self.planned.get(&date).copied().unwrap_or(0)
    }

    fn actual(&self, date: NaiveDate) -> u32 {
        self.actual.get(&date).copied().unwrap_or(0)
    }
}

/// Computes daily and range achievement under one no-plan policy
#[derive(Debug, Clone, Copy, Default)]
pub struct AchievementCalculator {
    policy: RatePolicy,
}

impl AchievementCalculator {
    pub fn new(policy: RatePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    pub fn rate(&self, planned: u64, actual: u64) -> u32 {
        rate_with_policy(self.policy, planned, actual)
    }

    /// Achievement for one date; a missing plan or record counts as 0 minutes
    pub fn daily_achievement(
        &self,
        records: &[ActualRecord],
        plans: &[PlanEntry],
        date: NaiveDate,
    ) -> AchievementResult {
        let index = DayIndex::build(records, plans);
        let planned_minutes = index.planned(date);
        let actual_minutes = index.actual(date);

        AchievementResult {
            date,
            planned_minutes,
            actual_minutes,
            achievement_rate: self.rate(u64::from(planned_minutes), u64::from(actual_minutes)),
        }
    }

    /// Sum planned and actual minutes over `dates`, then rate the sums
    pub fn range_stats(
        &self,
        records: &[ActualRecord],
        plans: &[PlanEntry],
        dates: &[NaiveDate],
    ) -> RangeStats {
        let index = DayIndex::build(records, plans);
        let (planned, actual) = dates.iter().fold((0u64, 0u64), |(p, a), date| {
            (
                p + u64::from(index.planned(*date)),
                a + u64::from(index.actual(*date)),
            )
        });

        RangeStats {
            planned,
            actual,
            achievement_rate: self.rate(planned, actual),
        }
    }

    /// Stats for the Monday-to-Sunday week containing `date`
    pub fn weekly_stats(
        &self,
        records: &[ActualRecord],
        plans: &[PlanEntry],
        date: NaiveDate,
    ) -> RangeStats {
        self.custom_range_stats(records, plans, &week_bounds(date))
    }

    /// Stats for the calendar month containing `date`
    pub fn monthly_stats(
        &self,
        records: &[ActualRecord],
        plans: &[PlanEntry],
        date: NaiveDate,
    ) -> RangeStats {
        self.custom_range_stats(records, plans, &month_bounds(date))
    }

    /// Stats for the calendar year containing `date`
    pub fn yearly_stats(
        &self,
        records: &[ActualRecord],
        plans: &[PlanEntry],
        date: NaiveDate,
    ) -> RangeStats {
        self.custom_range_stats(records, plans, &year_bounds(date))
    }

    /// Stats for an inclusive range. An inverted range covers no dates.
    pub fn custom_range_stats(
        &self,
        records: &[ActualRecord],
        plans: &[PlanEntry],
        range: &DateRange,
    ) -> RangeStats {
        self.range_stats(records, plans, &dates_in(range))
    }
}

/// Daily achievement under the canonical policy
pub fn daily_achievement(
    records: &[ActualRecord],
    plans: &[PlanEntry],
    date: NaiveDate,
) -> AchievementResult {
    AchievementCalculator::default().daily_achievement(records, plans, date)
}

/// Range stats under the canonical policy
pub fn range_stats(records: &[ActualRecord], plans: &[PlanEntry], dates: &[NaiveDate]) -> RangeStats {
    AchievementCalculator::default().range_stats(records, plans, dates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn plan(date: NaiveDate, total: u32) -> PlanEntry {
        PlanEntry::from_total(date, total)
    }

    fn record(date: NaiveDate, minutes: u32) -> ActualRecord {
        ActualRecord { date, minutes }
    }

    #[test]
    fn test_rate_formula() {
        assert_eq!(achievement_rate(60, 30), 50);
        assert_eq!(achievement_rate(60, 90), 150);
        assert_eq!(achievement_rate(120, 90), 75);
        assert_eq!(achievement_rate(60, 0), 0);
        // Halves round up
        assert_eq!(achievement_rate(8, 1), 13);
        assert_eq!(achievement_rate(3, 1), 33);
        assert_eq!(achievement_rate(3, 2), 67);
    }

    #[test]
    fn test_no_plan_policies() {
        for actual in [0, 1, 30, 1440] {
            assert_eq!(achievement_rate(0, actual), 0);
        }

        assert_eq!(rate_with_policy(RatePolicy::RewardEffort, 0, 30), 100);
        assert_eq!(rate_with_policy(RatePolicy::RewardEffort, 0, 0), 0);
        assert_eq!(rate_with_policy(RatePolicy::RewardEffort, 60, 30), 50);
    }

    #[test]
    fn test_daily_achievement_missing_data() {
        let result = daily_achievement(&[], &[], d(2025, 3, 1));
        assert_eq!(result.planned_minutes, 0);
        assert_eq!(result.actual_minutes, 0);
        assert_eq!(result.achievement_rate, 0);

        let unplanned = daily_achievement(&[record(d(2025, 3, 1), 45)], &[], d(2025, 3, 1));
        assert_eq!(unplanned.actual_minutes, 45);
        assert_eq!(unplanned.achievement_rate, 0);
    }

    #[test]
    fn test_daily_achievement_ignores_other_dates() {
        let records = vec![record(d(2025, 3, 1), 60), record(d(2025, 3, 2), 30)];
        let plans = vec![plan(d(2025, 3, 1), 60), plan(d(2025, 3, 2), 120)];

        let result = daily_achievement(&records, &plans, d(2025, 3, 2));
        assert_eq!(result.planned_minutes, 120);
        assert_eq!(result.actual_minutes, 30);
        assert_eq!(result.achievement_rate, 25);
    }

    #[test]
    fn test_range_is_sum_then_rate() {
        let records = vec![record(d(2025, 3, 1), 30)];
        let plans = vec![plan(d(2025, 3, 1), 30), plan(d(2025, 3, 2), 90)];
        let dates = vec![d(2025, 3, 1), d(2025, 3, 2)];

        let stats = range_stats(&records, &plans, &dates);
        assert_eq!(stats.planned, 120);
        assert_eq!(stats.actual, 30);
        // Not the average of 100% and 0%
        assert_eq!(stats.achievement_rate, 25);
    }

    #[test]
    fn test_empty_range() {
        let stats = range_stats(&[record(d(2025, 3, 1), 30)], &[], &[]);
        assert_eq!(stats, RangeStats { planned: 0, actual: 0, achievement_rate: 0 });
    }

    #[test]
    fn test_weekly_monthly_yearly() {
        let records = vec![
            record(d(2025, 2, 28), 60), // Friday, same week as 2025-03-01
            record(d(2025, 3, 1), 30),
            record(d(2025, 3, 3), 60), // next week
            record(d(2025, 12, 31), 10),
        ];
        let plans = vec![
            plan(d(2025, 2, 28), 60),
            plan(d(2025, 3, 1), 60),
            plan(d(2025, 3, 3), 60),
        ];
        let calc = AchievementCalculator::default();

        let week = calc.weekly_stats(&records, &plans, d(2025, 3, 1));
        assert_eq!((week.planned, week.actual, week.achievement_rate), (120, 90, 75));

        let month = calc.monthly_stats(&records, &plans, d(2025, 3, 15));
        assert_eq!((month.planned, month.actual, month.achievement_rate), (120, 90, 75));

        let year = calc.yearly_stats(&records, &plans, d(2025, 6, 1));
        assert_eq!((year.planned, year.actual), (180, 160));
        assert_eq!(year.achievement_rate, 89);
    }

    #[test]
    fn test_custom_range() {
        let records = vec![record(d(2024, 12, 31), 40), record(d(2025, 1, 1), 80)];
        let plans = vec![plan(d(2024, 12, 31), 60), plan(d(2025, 1, 1), 60)];
        let calc = AchievementCalculator::default();

        let range = DateRange { from: d(2024, 12, 31), to: d(2025, 1, 1) };
        let stats = calc.custom_range_stats(&records, &plans, &range);
        assert_eq!((stats.planned, stats.actual, stats.achievement_rate), (120, 120, 100));

        let inverted = DateRange { from: d(2025, 1, 1), to: d(2024, 12, 31) };
        assert_eq!(calc.custom_range_stats(&records, &plans, &inverted), RangeStats::default());
    }

    #[test]
    fn test_multiple_records_same_date_accumulate() {
        let date = d(2025, 3, 1);
        let records = vec![record(date, 40), record(date, 50)];
        let plans = vec![plan(date, 120)];

        let result = daily_achievement(&records, &plans, date);
        assert_eq!(result.actual_minutes, 90);
        assert_eq!(result.achievement_rate, 75);
    }
}
