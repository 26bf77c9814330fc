//! One invocation cycle for a single target
//!
//! quota check → (conditionally) paginated fetch → state transition → record framing.
//! The fetch is the only suspension point. A failed fetch returns the error and leaves
//! the caller's state untouched, so a retry reuses the same window and cursor.

use crate::collector::fetcher::{fetch_all, PageRequest, PageSource};
use crate::collector::scheduler::{quota_in_effect, transition};
use crate::config::SchedulerSettings;
use crate::output::{LogRecord, RecordFramer};
use crate::state::{CollectionState, FetchOutcome};
use crate::Result;
use chrono::{DateTime, Utc};

/// What one invocation hands back to the host
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Framed records, in upstream order
    pub records: Vec<LogRecord>,

    /// State to persist in place of the one passed in
    pub state: CollectionState,

    /// Seconds to wait before invoking this target again
    pub delay_secs: i64,
}

/// Runs one invocation for `state` at time `now`
///
/// While the quota is still exhausted no request is made at all.
pub async fn poll_once<S>(
    source: &S,
    framer: &RecordFramer,
    state: &CollectionState,
    now: DateTime<Utc>,
    settings: &SchedulerSettings,
) -> Result<Invocation>
where
    S: PageSource + ?Sized,
{
    let outcome = if quota_in_effect(state, now) {
        tracing::debug!(
            "Skipping fetch for target {}: quota resets at {:?}",
            state.target,
            state.quota_reset_at
        );
        FetchOutcome::empty()
    } else {
        fetch_all(source, &PageRequest::for_state(state), settings.page_budget).await?
    };

    let next = transition(state, outcome, now, settings);
    let records = framer.frame_all(&next.records);

    tracing::trace!(
        "Target {} produced {} records; next poll in {}s",
        state.target,
        records.len(),
        next.delay_secs
    );

    Ok(Invocation {
        records,
        state: next.state,
        delay_secs: next.delay_secs,
    })
}
