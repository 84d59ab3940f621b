//! Validated settings

use crate::schema::RawConfig;
use crate::validation::{parse_band_table, parse_rate_policy};
use studycal_api::Theme;
use studycal_util::default_data_dir;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of backup snapshots kept
pub const DEFAULT_MAX_BACKUPS: usize = 20;

/// Default undo window after a restore
pub const DEFAULT_UNDO_WINDOW: Duration = Duration::from_secs(5 * 60);

/// How a day with no plan is rated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatePolicy {
    /// No plan means 0%, whatever was studied
    #[default]
    Strict,
    /// No plan but some study time means 100%
    RewardEffort,
}

/// Which rate-to-band threshold table is used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandTableKind {
    #[default]
    Canonical,
    Legacy,
}

/// Validated settings ready for use by the engine
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub max_backups: usize,
    pub undo_window: Duration,
    pub rate_policy: RatePolicy,
    pub band_table: BandTableKind,
    pub theme: Theme,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        let defaults = Self::default();

        Self {
            data_dir: raw.storage.data_dir.unwrap_or(defaults.data_dir),
            max_backups: raw.storage.max_backups.unwrap_or(defaults.max_backups).max(1),
            undo_window: raw
                .restore
                .undo_window_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.undo_window),
            rate_policy: raw
                .achievement
                .no_plan_policy
                .as_deref()
                .and_then(parse_rate_policy)
                .unwrap_or(defaults.rate_policy),
            band_table: raw
                .achievement
                .band_table
                .as_deref()
                .and_then(parse_band_table)
                .unwrap_or(defaults.band_table),
            theme: raw
                .display
                .theme
                .as_deref()
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.theme),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_backups: DEFAULT_MAX_BACKUPS,
            undo_window: DEFAULT_UNDO_WINDOW,
            rate_policy: RatePolicy::default(),
            band_table: BandTableKind::default(),
            theme: Theme::default(),
        }
    }
}
