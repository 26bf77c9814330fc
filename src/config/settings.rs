use crate::config::types::{CatchUpConfig, Config, QuotaConfig};
use crate::config::validation::{bounded_hours, bounded_seconds};
use crate::ConfigError;
use chrono_tz::Tz;

/// Catch-up thresholds and window widths, in hours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatchUpPolicy {
    /// Backlog above which the day-sized window is used
    pub day_threshold_hours: i64,
    pub day_window_hours: i64,
    /// Backlog above which the hour-sized window is used
    pub hour_threshold_hours: i64,
    pub hour_window_hours: i64,
}

impl Default for CatchUpPolicy {
    fn default() -> Self {
        Self {
            day_threshold_hours: 24,
            day_window_hours: 24,
            hour_threshold_hours: 1,
            hour_window_hours: 1,
        }
    }
}

impl CatchUpPolicy {
    fn from_config(config: &CatchUpConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            day_threshold_hours: bounded_hours("day_threshold_hours", config.day_threshold_hours)?,
            day_window_hours: bounded_hours("day_window_hours", config.day_window_hours)?,
            hour_threshold_hours: bounded_hours(
                "hour_threshold_hours",
                config.hour_threshold_hours,
            )?,
            hour_window_hours: bounded_hours("hour_window_hours", config.hour_window_hours)?,
        })
    }
}

/// Resolved knobs the window scheduler and fetcher run with
///
/// Built once from a validated [`Config`]; nothing here is re-read during a run.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Base interval once a target tracks real time
    pub poll_interval_secs: i64,
    /// Delay while draining pages or catching up
    pub fast_retry_secs: i64,
    /// Poll interval while the daily quota is exhausted
    pub quota_cooldown_secs: i64,
    /// Added past the quota reset boundary
    pub quota_reset_buffer_secs: i64,
    /// Timezone whose local midnight resets the quota
    pub quota_timezone: Tz,
    pub catch_up: CatchUpPolicy,
    /// Page requests allowed per invocation, always at least one
    pub page_budget: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            fast_retry_secs: 1,
            quota_cooldown_secs: 900,
            quota_reset_buffer_secs: 30,
            quota_timezone: chrono_tz::America::Los_Angeles,
            catch_up: CatchUpPolicy::default(),
            page_budget: 1,
        }
    }
}

impl SchedulerSettings {
    /// Derives settings from a loaded configuration
    ///
    /// Durations past ten years are rejected here as well as in validation, since a
    /// `Config` can be built without going through the parser.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let collector = &config.collector;
        let quota = &config.quota;

        Ok(Self {
            poll_interval_secs: bounded_seconds(
                "poll_interval_seconds",
                collector.poll_interval_seconds,
            )?,
            fast_retry_secs: bounded_seconds("fast_retry_seconds", collector.fast_retry_seconds)?,
            quota_cooldown_secs: bounded_seconds("quota cooldown_seconds", quota.cooldown_seconds)?,
            quota_reset_buffer_secs: bounded_seconds(
                "quota reset_buffer_seconds",
                quota.reset_buffer_seconds,
            )?,
            quota_timezone: parse_timezone(quota)?,
            catch_up: CatchUpPolicy::from_config(&config.catch_up)?,
            page_budget: collector.page_budget.max(1),
        })
    }

    /// Default settings with the given base poll interval
    pub fn with_poll_interval(poll_interval_secs: i64) -> Self {
        Self {
            poll_interval_secs,
            ..Self::default()
        }
    }
}

/// Parses the configured quota timezone
pub(crate) fn parse_timezone(config: &QuotaConfig) -> Result<Tz, ConfigError> {
    config
        .timezone
        .parse::<Tz>()
        .map_err(|_| ConfigError::InvalidTimezone(config.timezone.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timezone() {
        let mut quota = QuotaConfig::default();
        assert_eq!(
            parse_timezone(&quota).unwrap(),
            chrono_tz::America::Los_Angeles
        );

        quota.timezone = "Europe/Berlin".to_string();
        assert_eq!(parse_timezone(&quota).unwrap(), chrono_tz::Europe::Berlin);

        quota.timezone = "Mars/Olympus".to_string();
        assert!(matches!(
            parse_timezone(&quota),
            Err(ConfigError::InvalidTimezone(_))
        ));
    }

    #[test]
    fn test_catch_up_policy_rejects_oversized_hours() {
        let mut config = CatchUpConfig::default();
        assert_eq!(
            CatchUpPolicy::from_config(&config).unwrap(),
            CatchUpPolicy::default()
        );

        config.day_window_hours = 10_000_000_000_000;
        assert!(matches!(
            CatchUpPolicy::from_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_with_poll_interval_keeps_defaults() {
        let settings = SchedulerSettings::with_poll_interval(60);
        assert_eq!(settings.poll_interval_secs, 60);
        assert_eq!(settings.quota_cooldown_secs, 900);
        assert_eq!(settings.page_budget, 1);
        assert_eq!(settings.catch_up, CatchUpPolicy::default());
    }
}
