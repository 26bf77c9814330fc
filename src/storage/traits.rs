//! Storage traits and error types

use crate::state::CollectionState;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for collection-state store implementations
///
/// A saved state fully replaces whatever was stored for its target.
pub trait StateStore {
    /// Gets the stored state of one target
    fn load_state(&self, target: &str) -> StorageResult<Option<CollectionState>>;

    /// Gets every stored state, keyed by target
    fn load_all_states(&self) -> StorageResult<HashMap<String, CollectionState>>;

    /// Stores a state, replacing the previous one for its target
    fn save_state(&mut self, state: &CollectionState) -> StorageResult<()>;

    /// Removes every stored state
    fn clear(&mut self) -> StorageResult<()>;
}
