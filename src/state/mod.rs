//! State module for tracking collection progress
//!
//! # Components
//!
//! - `CollectionState`: the per-target window, cursor and quota state carried between invocations
//! - `FetchOutcome`: the result of one paginated fetch, consumed by the window scheduler

mod collection_state;
mod outcome;

// Re-export main types
pub use collection_state::CollectionState;
pub use outcome::FetchOutcome;
