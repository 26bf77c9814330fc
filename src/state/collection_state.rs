use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Tracks the collection progress of one target between invocations
///
/// A state is never mutated in place by the host: each invocation consumes the
/// previous state and returns its replacement.
///
/// Invariants: `since <= until`, `until` only moves forward, and
/// `poll_interval_seconds > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionState {
    /// Identifier of the polled entity
    pub target: String,

    /// Inclusive start of the current window
    pub since: DateTime<Utc>,

    /// Exclusive end of the current window
    pub until: DateTime<Utc>,

    /// Cursor for resuming a partially fetched window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,

    /// When the exhausted upstream quota is expected back
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_reset_at: Option<DateTime<Utc>>,

    /// Delay the host waits before the next invocation
    pub poll_interval_seconds: i64,
}

impl CollectionState {
    /// Creates a fresh state for a window starting at `since`
    pub fn new(
        target: impl Into<String>,
        since: DateTime<Utc>,
        window_seconds: i64,
        poll_interval_seconds: i64,
    ) -> Self {
        Self {
            target: target.into(),
            since,
            until: since + Duration::seconds(window_seconds),
            continuation_token: None,
            quota_reset_at: None,
            poll_interval_seconds,
        }
    }

    /// Returns true if the quota reset lies after `now`
    pub fn is_quota_limited(&self, now: DateTime<Utc>) -> bool {
        matches!(self.quota_reset_at, Some(reset) if now < reset)
    }

    /// When a host restarting at `now` should first invoke this state again
    ///
    /// A state waiting on the quota is due at the reset (or at once if that has
    /// passed); any other state is due one poll interval from `now`.
    pub fn resume_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.quota_reset_at {
            Some(reset) => std::cmp::max(reset, now),
            None => now + Duration::seconds(self.poll_interval_seconds),
        }
    }

    /// Width of the current window
    pub fn window(&self) -> Duration {
        self.until - self.since
    }

    /// How far `now` is past the end of the current window (zero if not past it)
    pub fn lag(&self, now: DateTime<Utc>) -> Duration {
        std::cmp::max(now - self.until, Duration::zero())
    }
}
