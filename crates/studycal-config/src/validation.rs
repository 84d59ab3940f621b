//! Configuration validation

use crate::schema::RawConfig;
use studycal_api::Theme;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("[storage] max_backups must be at least 1")]
    ZeroMaxBackups,

    #[error("[restore] undo_window_seconds must be greater than 0")]
    ZeroUndoWindow,

    #[error("Unknown {field} '{value}': expected one of {expected}")]
    UnknownChoice {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.storage.max_backups == Some(0) {
        errors.push(ValidationError::ZeroMaxBackups);
    }

    if config.restore.undo_window_seconds == Some(0) {
        errors.push(ValidationError::ZeroUndoWindow);
    }

    if let Some(policy) = &config.achievement.no_plan_policy
        && parse_rate_policy(policy).is_none()
    {
        errors.push(ValidationError::UnknownChoice {
            field: "no_plan_policy",
            value: policy.clone(),
            expected: "strict, reward_effort",
        });
    }

    if let Some(table) = &config.achievement.band_table
        && parse_band_table(table).is_none()
    {
        errors.push(ValidationError::UnknownChoice {
            field: "band_table",
            value: table.clone(),
            expected: "canonical, legacy",
        });
    }

    if let Some(theme) = &config.display.theme
        && theme.parse::<Theme>().is_err()
    {
        errors.push(ValidationError::UnknownChoice {
            field: "theme",
            value: theme.clone(),
            expected: "classic, green, github",
        });
    }

    errors
}

/// Parse a no-plan policy name
pub fn parse_rate_policy(s: &str) -> Option<crate::RatePolicy> {
    match s.trim().to_lowercase().as_str() {
        "strict" => Some(crate::RatePolicy::Strict),
        "reward_effort" | "reward-effort" => Some(crate::RatePolicy::RewardEffort),
        _ => None,
    }
}

/// Parse a band table name
pub fn parse_band_table(s: &str) -> Option<crate::BandTableKind> {
    match s.trim().to_lowercase().as_str() {
        "canonical" => Some(crate::BandTableKind::Canonical),
        "legacy" => Some(crate::BandTableKind::Legacy),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BandTableKind, RatePolicy};

    #[test]
    fn test_parse_rate_policy() {
        assert_eq!(parse_rate_policy("strict"), Some(RatePolicy::Strict));
        assert_eq!(parse_rate_policy("Reward_Effort"), Some(RatePolicy::RewardEffort));
        assert_eq!(parse_rate_policy("reward-effort"), Some(RatePolicy::RewardEffort));
        assert_eq!(parse_rate_policy("lenient"), None);
    }

    #[test]
    fn test_parse_band_table() {
        assert_eq!(parse_band_table("canonical"), Some(BandTableKind::Canonical));
        assert_eq!(parse_band_table("legacy"), Some(BandTableKind::Legacy));
        assert_eq!(parse_band_table("v3"), None);
    }

    #[test]
    fn test_collects_all_errors() {
        let config: RawConfig = toml::from_str(
            r#"
            config_version = 1
            [restore]
            undo_window_seconds = 0
            [achievement]
            no_plan_policy = "lenient"
            band_table = "v3"
        "#,
        )
        .unwrap();

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::ZeroUndoWindow)));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::UnknownChoice { field: "band_table", .. }
        )));
    }
}
