//! Configuration module for the collector
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and resolving them into the settings the window scheduler runs with.
//!
//! # Example
//!
//! ```no_run
//! use activity_collector::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("collector.toml")).unwrap();
//! println!("Polling {} targets", config.collector.targets.len());
//! ```

mod parser;
mod settings;
mod types;
mod validation;

// Re-export types
pub use types::{
    CatchUpConfig, CollectorConfig, Config, CredentialsConfig, QuotaConfig, RecordConfig,
    StorageConfig, UpstreamConfig,
};

pub use settings::{CatchUpPolicy, SchedulerSettings};

pub(crate) use validation::bounded_seconds;

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
