//! Storage module for persisting collection states
//!
//! The collector core never persists anything itself; this module is the host-side
//! store the CLI uses to carry each target's state from one invocation to the next.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStateStore;
pub use traits::{StateStore, StorageError, StorageResult};

use crate::collector::initialize;
use crate::config::CollectorConfig;
use crate::state::CollectionState;
use crate::CollectorError;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Opens (creating if needed) the state database at `path`
pub fn open_storage(path: &Path) -> Result<SqliteStateStore, CollectorError> {
    SqliteStateStore::new(path)
}

/// Returns one state per configured target, resuming stored ones
///
/// Targets without a stored state are initialized and saved immediately. Stored
/// states for targets no longer configured are left in place but not returned.
pub fn load_or_initialize<S: StateStore>(
    store: &mut S,
    config: &CollectorConfig,
    now: DateTime<Utc>,
) -> Result<Vec<CollectionState>, CollectorError> {
    let mut stored = store.load_all_states()?;
    let fresh = initialize(config, now)?;

    let mut states = Vec::with_capacity(fresh.len());
    for initial in fresh {
        match stored.remove(&initial.target) {
            Some(existing) => {
                tracing::info!(
                    "Resuming target {} at window {} - {}",
                    existing.target,
                    existing.since.to_rfc3339(),
                    existing.until.to_rfc3339()
                );
                states.push(existing);
            }
            None => {
                tracing::info!("No stored state for target {}, starting fresh", initial.target);
                store.save_state(&initial)?;
                states.push(initial);
            }
        }
    }

    for target in stored.keys() {
        tracing::warn!("Ignoring stored state for unconfigured target {}", target);
    }

    Ok(states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn create_collector_config(targets: &[&str]) -> CollectorConfig {
        CollectorConfig {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            start_time: None,
            initial_lookback_seconds: 600,
            poll_interval_seconds: 60,
            page_budget: 1,
            fast_retry_seconds: 1,
        }
    }

    #[test]
    fn test_load_or_initialize_mixes_stored_and_fresh() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut store = SqliteStateStore::new_in_memory().unwrap();

        let mut stored = CollectionState::new("login", now - Duration::days(2), 60, 1);
        stored.continuation_token = Some("cursor".to_string());
        store.save_state(&stored).unwrap();
        store
            .save_state(&CollectionState::new("retired", now, 60, 1))
            .unwrap();

        let config = create_collector_config(&["login", "admin"]);
        let states = load_or_initialize(&mut store, &config, now).unwrap();

        assert_eq!(states.len(), 2);
        assert_eq!(states[0], stored);
        assert_eq!(states[1].target, "admin");
        assert_eq!(states[1].since, now - Duration::minutes(10));

        assert!(store.load_state("admin").unwrap().is_some());
        assert!(store.load_state("retired").unwrap().is_some());
    }
}
