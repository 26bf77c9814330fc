//! Window scheduler
//!
//! Owns the collection-state transitions: given the previous state, the outcome of a
//! fetch and the current time, it decides the next `[since, until)` window, the next
//! poll delay, and whether the target is still waiting out an exhausted quota.
//!
//! Cases are evaluated in order:
//!
//! | Condition | Next state | Delay |
//! |-----------|------------|-------|
//! | quota reset still in the future | unchanged | current poll interval |
//! | fetch hit the daily quota | same window, reset time set | quota cooldown |
//! | more pages pending | same window, new continuation token | fast retry |
//! | window drained | next catch-up window | fast retry if it already ended, else poll interval |

use crate::config::{bounded_seconds, CollectorConfig, SchedulerSettings};
use crate::state::{CollectionState, FetchOutcome};
use crate::ConfigError;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;

/// Delay before the first invocation of a freshly initialized target
pub const INITIAL_DELAY_SECS: i64 = 1;

/// Result of one state transition
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Raw events to emit for this invocation
    pub records: Vec<Value>,

    /// State the host must persist in place of the previous one
    pub state: CollectionState,

    /// Seconds the host waits before the next invocation
    pub delay_secs: i64,
}

/// Creates the first collection state for every configured target
///
/// Every window starts at the configured `start-time`, or `initial-lookback-seconds`
/// before `now` when none is set, and spans one poll interval. The first invocation
/// is scheduled after [`INITIAL_DELAY_SECS`].
///
/// # Errors
///
/// Returns a [`ConfigError`] when the start time cannot be parsed or no targets are
/// configured; no state is produced in that case.
pub fn initialize(
    config: &CollectorConfig,
    now: DateTime<Utc>,
) -> Result<Vec<CollectionState>, ConfigError> {
    if config.targets.is_empty() {
        return Err(ConfigError::Validation(
            "at least one target must be configured".to_string(),
        ));
    }

    if config.poll_interval_seconds == 0 {
        return Err(ConfigError::Validation(
            "poll_interval_seconds must be > 0".to_string(),
        ));
    }

    let window = bounded_seconds("poll_interval_seconds", config.poll_interval_seconds)?;
    let start = resolve_start_time(config, now)?;
    if start.checked_add_signed(Duration::seconds(window)).is_none() {
        return Err(ConfigError::InvalidTimestamp(format!(
            "first window starting at {} is out of range",
            start.to_rfc3339()
        )));
    }

    tracing::info!(
        "Initializing {} targets with first window starting at {}",
        config.targets.len(),
        start.to_rfc3339()
    );

    Ok(config
        .targets
        .iter()
        .map(|target| CollectionState::new(target.as_str(), start, window, INITIAL_DELAY_SECS))
        .collect())
}

/// Resolves the first window start from the configuration
fn resolve_start_time(
    config: &CollectorConfig,
    now: DateTime<Utc>,
) -> Result<DateTime<Utc>, ConfigError> {
    match &config.start_time {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| ConfigError::InvalidTimestamp(format!("start-time '{}': {}", raw, e))),
        None => {
            let lookback =
                bounded_seconds("initial_lookback_seconds", config.initial_lookback_seconds)?;
            now.checked_sub_signed(Duration::seconds(lookback))
                .ok_or_else(|| {
                    ConfigError::InvalidTimestamp(format!(
                        "lookback of {}s before {} is out of range",
                        lookback,
                        now.to_rfc3339()
                    ))
                })
        }
    }
}

/// Returns true if the target must skip fetching this cycle
///
/// The host checks this before fetching so no further quota is spent while the
/// upstream limit is still exhausted.
pub fn quota_in_effect(state: &CollectionState, now: DateTime<Utc>) -> bool {
    state.is_quota_limited(now)
}

/// Computes the state that replaces `state` after an invocation
pub fn transition(
    state: &CollectionState,
    outcome: FetchOutcome,
    now: DateTime<Utc>,
    settings: &SchedulerSettings,
) -> Transition {
    if quota_in_effect(state, now) {
        tracing::trace!(
            "Target {} still rate limited until {:?}, holding window",
            state.target,
            state.quota_reset_at
        );
        return Transition {
            records: Vec::new(),
            state: state.clone(),
            delay_secs: state.poll_interval_seconds,
        };
    }

    match outcome {
        FetchOutcome::QuotaExceeded => {
            let reset = next_quota_reset(
                now,
                settings.quota_timezone,
                settings.quota_reset_buffer_secs,
            );
            tracing::info!(
                "Daily quota exhausted for target {}; retrying window {} - {} after {}",
                state.target,
                state.since.to_rfc3339(),
                state.until.to_rfc3339(),
                reset.to_rfc3339()
            );

            let next = CollectionState {
                quota_reset_at: Some(reset),
                poll_interval_seconds: settings.quota_cooldown_secs,
                ..state.clone()
            };

            Transition {
                records: Vec::new(),
                state: next,
                delay_secs: settings.quota_cooldown_secs,
            }
        }

        FetchOutcome::Pending {
            records,
            continuation_token,
        } => {
            tracing::debug!(
                "Target {} has more pages in window {} - {}, resuming shortly",
                state.target,
                state.since.to_rfc3339(),
                state.until.to_rfc3339()
            );

            let next = CollectionState {
                continuation_token: Some(continuation_token),
                quota_reset_at: None,
                poll_interval_seconds: settings.fast_retry_secs,
                ..state.clone()
            };

            Transition {
                records,
                state: next,
                delay_secs: settings.fast_retry_secs,
            }
        }

        FetchOutcome::Drained { records } => {
            let next = next_window(state, now, settings);
            let delay_secs = next.poll_interval_seconds;

            tracing::debug!(
                "Target {} drained; next window {} - {} in {}s",
                state.target,
                next.since.to_rfc3339(),
                next.until.to_rfc3339(),
                delay_secs
            );

            Transition {
                records,
                state: next,
                delay_secs,
            }
        }
    }
}

/// Computes the window that follows a fully drained one
///
/// While the drained window ends within one poll interval of `now` the next window
/// starts at `now`; further behind, it continues from the previous `until` so no
/// range is skipped. The width grows with the backlog (day, hour, or one interval),
/// which bounds every request while converging on real time.
///
/// A next window that already ended before `now` is fetched after the fast retry,
/// so a target never waits a full interval while it lags.
fn next_window(
    state: &CollectionState,
    now: DateTime<Utc>,
    settings: &SchedulerSettings,
) -> CollectionState {
    let interval = Duration::seconds(settings.poll_interval_secs);
    let behind = state.lag(now);

    let drained_until = if behind > interval { state.until } else { now };
    let since = std::cmp::max(drained_until, state.since);

    let width = catch_up_width(behind, settings);
    let until = std::cmp::max(since + width, state.until);

    let poll_interval_seconds = if until < now {
        settings.fast_retry_secs
    } else {
        settings.poll_interval_secs
    };

    CollectionState {
        target: state.target.clone(),
        since,
        until,
        continuation_token: None,
        quota_reset_at: None,
        poll_interval_seconds,
    }
}

/// Picks the next window width from how far collection is behind
pub fn catch_up_width(behind: Duration, settings: &SchedulerSettings) -> Duration {
    let policy = &settings.catch_up;

    if behind > Duration::hours(policy.day_threshold_hours) {
        Duration::hours(policy.day_window_hours)
    } else if behind > Duration::hours(policy.hour_threshold_hours) {
        Duration::hours(policy.hour_window_hours)
    } else {
        Duration::seconds(settings.poll_interval_secs)
    }
}

/// Returns the next local midnight in `tz` after `now`, plus `buffer_secs`
///
/// When midnight does not exist locally (a DST gap), the first valid instant of the
/// following day is used.
pub fn next_quota_reset(now: DateTime<Utc>, tz: Tz, buffer_secs: i64) -> DateTime<Utc> {
    let buffer = Duration::seconds(buffer_secs);
    let local_today = now.with_timezone(&tz).date_naive();

    let boundary = local_today.succ_opt().and_then(|tomorrow| {
        let midnight = tomorrow.and_time(NaiveTime::MIN);
        tz.from_local_datetime(&midnight)
            .earliest()
            .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
    });

    match boundary {
        Some(reset) => reset.with_timezone(&Utc) + buffer,
        None => now + Duration::days(1) + buffer,
    }
}
