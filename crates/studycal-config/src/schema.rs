//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    #[serde(default)]
    pub storage: RawStorageConfig,

    #[serde(default)]
    pub restore: RawRestoreConfig,

    #[serde(default)]
    pub achievement: RawAchievementConfig,

    #[serde(default)]
    pub display: RawDisplayConfig,
}

/// Where data lives and how many backups are kept
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawStorageConfig {
    /// Data directory for the database
    pub data_dir: Option<PathBuf>,

    /// Maximum number of backup snapshots kept (oldest evicted first)
    pub max_backups: Option<usize>,
}

/// Restore undo window
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRestoreConfig {
    /// Seconds after a restore during which it can be undone
    pub undo_window_seconds: Option<u64>,
}

/// Achievement policy choices
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAchievementConfig {
    /// "strict" or "reward_effort"
    pub no_plan_policy: Option<String>,

    /// "canonical" or "legacy"
    pub band_table: Option<String>,
}

/// Display settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDisplayConfig {
    /// "classic", "green" or "github"
    pub theme: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sections() {
        let toml_str = r#"
            config_version = 1

            [storage]
            max_backups = 30

            [achievement]
            no_plan_policy = "strict"
        "#;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage.max_backups, Some(30));
        assert_eq!(config.achievement.no_plan_policy.as_deref(), Some("strict"));
        assert!(config.display.theme.is_none());
        assert!(config.restore.undo_window_seconds.is_none());
    }
}
