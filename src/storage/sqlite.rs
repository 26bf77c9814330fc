//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the StateStore trait.

use crate::state::CollectionState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StateStore, StorageError, StorageResult};
use crate::CollectorError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const SELECT_STATE: &str = "SELECT target, since, until, continuation_token, quota_reset_at,
        poll_interval_seconds FROM collection_states";

/// SQLite state store
pub struct SqliteStateStore {
    conn: Connection,
}

impl SqliteStateStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> Result<Self, CollectorError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, CollectorError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

/// Raw column values of one row, converted outside the rusqlite closure
struct StateRow {
    target: String,
    since: String,
    until: String,
    continuation_token: Option<String>,
    quota_reset_at: Option<String>,
    poll_interval_seconds: i64,
}

impl StateRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            target: row.get(0)?,
            since: row.get(1)?,
            until: row.get(2)?,
            continuation_token: row.get(3)?,
            quota_reset_at: row.get(4)?,
            poll_interval_seconds: row.get(5)?,
        })
    }

    fn into_state(self) -> StorageResult<CollectionState> {
        Ok(CollectionState {
            since: parse_timestamp(&self.since)?,
            until: parse_timestamp(&self.until)?,
            quota_reset_at: self
                .quota_reset_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            target: self.target,
            continuation_token: self.continuation_token,
            poll_interval_seconds: self.poll_interval_seconds,
        })
    }
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("bad timestamp '{}': {}", raw, e)))
}

impl StateStore for SqliteStateStore {
    fn load_state(&self, target: &str) -> StorageResult<Option<CollectionState>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE target = ?1", SELECT_STATE))?;

        let row = stmt
            .query_row(params![target], StateRow::from_row)
            .optional()?;

        row.map(StateRow::into_state).transpose()
    }

    fn load_all_states(&self) -> StorageResult<HashMap<String, CollectionState>> {
        let mut stmt = self.conn.prepare(SELECT_STATE)?;
        let rows = stmt.query_map([], StateRow::from_row)?;

        let mut states = HashMap::new();
        for row in rows {
            let state = row?.into_state()?;
            states.insert(state.target.clone(), state);
        }

        Ok(states)
    }

    fn save_state(&mut self, state: &CollectionState) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO collection_states
             (target, since, until, continuation_token, quota_reset_at, poll_interval_seconds, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                state.target,
                state.since.to_rfc3339(),
                state.until.to_rfc3339(),
                state.continuation_token,
                state.quota_reset_at.map(|ts| ts.to_rfc3339()),
                state.poll_interval_seconds,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM collection_states", [])?;
        Ok(())
    }
}
