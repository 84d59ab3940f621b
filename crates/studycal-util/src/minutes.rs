//! Minute arithmetic
//!
//! Plans are entered as (hours, minutes) pairs while records and all
//! calculations work in total minutes. Every stored minute value lives in
//! `[0, MAX_MINUTES_PER_DAY]` once sanitized.

/// Maximum minutes that can be planned or recorded on one day
pub const MAX_MINUTES_PER_DAY: u32 = 24 * 60;

/// Maximum hours accepted for a plan
pub const MAX_PLAN_HOURS: u32 = 24;

/// Maximum minute component accepted for a plan
pub const MAX_PLAN_MINUTES: u32 = 59;

/// Convert an (hours, minutes) pair to total minutes, saturating at
/// `u32::MAX`. No day cap is applied.
pub fn to_minutes(hours: u32, minutes: u32) -> u32 {
    hours.saturating_mul(60).saturating_add(minutes)
}

/// Split total minutes into (hours, minutes)
pub fn from_minutes(total: u32) -> (u32, u32) {
    (total / 60, total % 60)
}

/// Clamp a candidate minute value into `[0, maximum]`.
///
/// Non-finite input (NaN, infinities) is treated as 0. Fractional values are
/// rounded to the nearest minute before clamping.
pub fn clamp_minutes(candidate: f64, maximum: u32) -> u32 {
    if !candidate.is_finite() {
        return 0;
    }
    candidate.round().clamp(0.0, f64::from(maximum)) as u32
}

/// Format total minutes for display, e.g. `2h 05m` or `45m`
pub fn format_minutes(total: u32) -> String {
    let (hours, minutes) = from_minutes(total);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
