//! Database schema definitions

/// SQL schema for the state database
pub const SCHEMA_SQL: &str = r#"
-- One row per polled target; replaced after every invocation
CREATE TABLE IF NOT EXISTS collection_states (
    target TEXT PRIMARY KEY,
    since TEXT NOT NULL,
    until TEXT NOT NULL,
    continuation_token TEXT,
    quota_reset_at TEXT,
    poll_interval_seconds INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
