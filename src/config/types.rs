use serde::Deserialize;

/// Main configuration structure for the collector
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub collector: CollectorConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(rename = "catch-up", default)]
    pub catch_up: CatchUpConfig,
    pub upstream: UpstreamConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub record: RecordConfig,
    pub storage: StorageConfig,
}

/// Polling behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    /// Logical entities to poll (one collection state each)
    pub targets: Vec<String>,

    /// RFC 3339 timestamp of the first window start; overrides the lookback
    #[serde(rename = "start-time", default)]
    pub start_time: Option<String>,

    /// How far back the first window starts when no start time is configured
    #[serde(rename = "initial-lookback-seconds", default = "default_lookback")]
    pub initial_lookback_seconds: u64,

    /// Base delay between polls once a target tracks real time
    #[serde(rename = "poll-interval-seconds", default = "default_poll_interval")]
    pub poll_interval_seconds: u64,

    /// Maximum number of page requests per invocation (0 means one page)
    #[serde(rename = "page-budget", default)]
    pub page_budget: u32,

    /// Delay used while draining pages or catching up
    #[serde(rename = "fast-retry-seconds", default = "default_fast_retry")]
    pub fast_retry_seconds: u64,
}

/// Daily quota handling
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    /// Poll interval while waiting for the quota to reset
    #[serde(rename = "cooldown-seconds", default = "default_cooldown")]
    pub cooldown_seconds: u64,

    /// Added to the reset boundary to absorb clock skew
    #[serde(rename = "reset-buffer-seconds", default = "default_reset_buffer")]
    pub reset_buffer_seconds: u64,

    /// IANA timezone in which the upstream quota resets at midnight
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Upstream error reason code identifying daily quota exhaustion
    #[serde(rename = "error-reason", default = "default_error_reason")]
    pub error_reason: String,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: default_cooldown(),
            reset_buffer_seconds: default_reset_buffer(),
            timezone: default_timezone(),
            error_reason: default_error_reason(),
        }
    }
}

/// Catch-up window widths and the backlog thresholds that select them
#[derive(Debug, Clone, Deserialize)]
pub struct CatchUpConfig {
    #[serde(rename = "day-threshold-hours", default = "default_day_hours")]
    pub day_threshold_hours: u64,

    #[serde(rename = "day-window-hours", default = "default_day_hours")]
    pub day_window_hours: u64,

    #[serde(rename = "hour-threshold-hours", default = "default_hour_hours")]
    pub hour_threshold_hours: u64,

    #[serde(rename = "hour-window-hours", default = "default_hour_hours")]
    pub hour_window_hours: u64,
}

impl Default for CatchUpConfig {
    fn default() -> Self {
        Self {
            day_threshold_hours: default_day_hours(),
            day_window_hours: default_day_hours(),
            hour_threshold_hours: default_hour_hours(),
            hour_window_hours: default_hour_hours(),
        }
    }
}

/// Upstream activity API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL; the target identifier is appended as the last path segment
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Page size requested from the upstream
    #[serde(rename = "max-results", default = "default_max_results")]
    pub max_results: u32,

    /// Per-request timeout
    #[serde(rename = "timeout-seconds", default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Credential inputs supplied by the host's secret store
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    /// Path to the JSON credential blob
    #[serde(rename = "credentials-path")]
    pub credentials_path: String,

    /// Comma-separated scope list
    pub scopes: String,
}

/// Log record framing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RecordConfig {
    /// Type tag attached to every record
    #[serde(rename = "log-type", default = "default_log_type")]
    pub log_type: String,

    /// Syslog severity attached to every record (0-7)
    #[serde(default = "default_priority")]
    pub priority: u8,

    /// Candidate dot-separated paths for the event timestamp
    #[serde(rename = "timestamp-paths", default = "default_timestamp_paths")]
    pub timestamp_paths: Vec<String>,

    /// Candidate dot-separated paths for the event type identifier
    #[serde(rename = "type-paths", default = "default_type_paths")]
    pub type_paths: Vec<String>,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            log_type: default_log_type(),
            priority: default_priority(),
            timestamp_paths: default_timestamp_paths(),
            type_paths: default_type_paths(),
        }
    }
}

/// Host-side state persistence
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database holding collection states
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_lookback() -> u64 {
    3600
}

fn default_poll_interval() -> u64 {
    300
}

fn default_fast_retry() -> u64 {
    1
}

fn default_cooldown() -> u64 {
    900
}

fn default_reset_buffer() -> u64 {
    30
}

fn default_timezone() -> String {
    "America/Los_Angeles".to_string()
}

fn default_error_reason() -> String {
    "dailyLimitExceeded".to_string()
}

fn default_day_hours() -> u64 {
    24
}

fn default_hour_hours() -> u64 {
    1
}

fn default_max_results() -> u32 {
    1000
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("activity-collector/{}", env!("CARGO_PKG_VERSION"))
}

fn default_log_type() -> String {
    "activity".to_string()
}

fn default_priority() -> u8 {
    6
}

fn default_timestamp_paths() -> Vec<String> {
    vec!["id.time".to_string(), "time".to_string(), "timestamp".to_string()]
}

fn default_type_paths() -> Vec<String> {
    vec![
        "id.applicationName".to_string(),
        "events.0.name".to_string(),
        "kind".to_string(),
    ]
}
