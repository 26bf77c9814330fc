use crate::config::settings::parse_timezone;
use crate::config::types::{
    CatchUpConfig, CollectorConfig, Config, CredentialsConfig, QuotaConfig, RecordConfig,
    StorageConfig, UpstreamConfig,
};
use crate::credentials::parse_scopes;
use crate::ConfigError;
use chrono::DateTime;
use std::collections::HashSet;
use url::Url;

/// Longest duration any setting may express: ten years
pub(crate) const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;
pub(crate) const MAX_DURATION_HOURS: u64 = MAX_DURATION_SECS / 3600;

/// Converts a seconds setting to `i64`, rejecting values past [`MAX_DURATION_SECS`]
pub(crate) fn bounded_seconds(field: &str, value: u64) -> Result<i64, ConfigError> {
    i64::try_from(value)
        .ok()
        .filter(|_| value <= MAX_DURATION_SECS)
        .ok_or_else(|| {
            ConfigError::Validation(format!(
                "{} must be at most {} seconds, got {}",
                field, MAX_DURATION_SECS, value
            ))
        })
}

/// Converts an hours setting to `i64`, rejecting values past [`MAX_DURATION_HOURS`]
pub(crate) fn bounded_hours(field: &str, value: u64) -> Result<i64, ConfigError> {
    i64::try_from(value)
        .ok()
        .filter(|_| value <= MAX_DURATION_HOURS)
        .ok_or_else(|| {
            ConfigError::Validation(format!(
                "{} must be at most {} hours, got {}",
                field, MAX_DURATION_HOURS, value
            ))
        })
}

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_collector_config(&config.collector)?;
    validate_quota_config(&config.quota)?;
    validate_catch_up_config(&config.catch_up)?;
    validate_upstream_config(&config.upstream)?;
    validate_credentials_config(&config.credentials)?;
    validate_record_config(&config.record)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates collector configuration
fn validate_collector_config(config: &CollectorConfig) -> Result<(), ConfigError> {
    validate_targets(&config.targets)?;

    if let Some(start) = &config.start_time {
        DateTime::parse_from_rfc3339(start).map_err(|e| {
            ConfigError::InvalidTimestamp(format!("start-time '{}': {}", start, e))
        })?;
    }

    if config.poll_interval_seconds == 0 {
        return Err(ConfigError::Validation(
            "poll_interval_seconds must be > 0".to_string(),
        ));
    }

    if config.fast_retry_seconds == 0 {
        return Err(ConfigError::Validation(
            "fast_retry_seconds must be > 0".to_string(),
        ));
    }

    bounded_seconds("poll_interval_seconds", config.poll_interval_seconds)?;
    bounded_seconds("fast_retry_seconds", config.fast_retry_seconds)?;
    bounded_seconds("initial_lookback_seconds", config.initial_lookback_seconds)?;

    Ok(())
}

/// Validates the target list: non-empty, unique, usable as a path segment
fn validate_targets(targets: &[String]) -> Result<(), ConfigError> {
    if targets.is_empty() {
        return Err(ConfigError::Validation(
            "at least one target must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for target in targets {
        if target.trim().is_empty() {
            return Err(ConfigError::Validation(
                "target identifiers cannot be empty".to_string(),
            ));
        }

        if !target
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(ConfigError::Validation(format!(
                "target '{}' must contain only alphanumeric characters, '_', '-' or '.'",
                target
            )));
        }

        if !seen.insert(target.as_str()) {
            return Err(ConfigError::Validation(format!(
                "target '{}' is listed more than once",
                target
            )));
        }
    }

    Ok(())
}

/// Validates quota configuration
fn validate_quota_config(config: &QuotaConfig) -> Result<(), ConfigError> {
    if config.cooldown_seconds == 0 {
        return Err(ConfigError::Validation(
            "quota cooldown_seconds must be > 0".to_string(),
        ));
    }

    if config.error_reason.is_empty() {
        return Err(ConfigError::Validation(
            "quota error_reason cannot be empty".to_string(),
        ));
    }

    bounded_seconds("quota cooldown_seconds", config.cooldown_seconds)?;
    bounded_seconds("quota reset_buffer_seconds", config.reset_buffer_seconds)?;

    parse_timezone(config)?;

    Ok(())
}

/// Validates catch-up thresholds
fn validate_catch_up_config(config: &CatchUpConfig) -> Result<(), ConfigError> {
    if config.day_window_hours == 0 || config.hour_window_hours == 0 {
        return Err(ConfigError::Validation(
            "catch-up window widths must be > 0".to_string(),
        ));
    }

    bounded_hours("day_threshold_hours", config.day_threshold_hours)?;
    bounded_hours("day_window_hours", config.day_window_hours)?;
    bounded_hours("hour_threshold_hours", config.hour_threshold_hours)?;
    bounded_hours("hour_window_hours", config.hour_window_hours)?;

    if config.day_threshold_hours < config.hour_threshold_hours {
        return Err(ConfigError::Validation(format!(
            "day_threshold_hours ({}) must be >= hour_threshold_hours ({})",
            config.day_threshold_hours, config.hour_threshold_hours
        )));
    }

    Ok(())
}

/// Validates upstream configuration
fn validate_upstream_config(config: &UpstreamConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' cannot carry path segments",
            config.base_url
        )));
    }

    if config.max_results == 0 {
        return Err(ConfigError::Validation(
            "max_results must be > 0".to_string(),
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(ConfigError::Validation(
            "timeout_seconds must be > 0".to_string(),
        ));
    }

    bounded_seconds("timeout_seconds", config.timeout_seconds)?;

    Ok(())
}

/// Validates credential inputs
fn validate_credentials_config(config: &CredentialsConfig) -> Result<(), ConfigError> {
    if config.credentials_path.is_empty() {
        return Err(ConfigError::Validation(
            "credentials_path cannot be empty".to_string(),
        ));
    }

    if parse_scopes(&config.scopes).is_empty() {
        return Err(ConfigError::Validation(
            "at least one credential scope is required".to_string(),
        ));
    }

    Ok(())
}

/// Validates record framing configuration
fn validate_record_config(config: &RecordConfig) -> Result<(), ConfigError> {
    if config.log_type.is_empty() {
        return Err(ConfigError::Validation(
            "log_type cannot be empty".to_string(),
        ));
    }

    if config.priority > 7 {
        return Err(ConfigError::Validation(format!(
            "priority must be a syslog severity between 0 and 7, got {}",
            config.priority
        )));
    }

    if config
        .timestamp_paths
        .iter()
        .chain(config.type_paths.iter())
        .any(|p| p.is_empty())
    {
        return Err(ConfigError::Validation(
            "record lookup paths cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
