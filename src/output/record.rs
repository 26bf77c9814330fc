//! Log record framing
//!
//! Each raw event becomes one [`LogRecord`]. Timestamp and type lookups walk a list of
//! candidate paths and take the first hit; a miss only leaves the field empty.

use crate::config::RecordConfig;
use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;

/// A framed log record ready for shipping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    /// Event time, seconds since the epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Sub-second part of the event time, in microseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_usec: Option<u32>,

    /// Event type identifier
    #[serde(rename = "type_id", skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,

    /// The original event serialized as JSON
    pub message: String,

    /// Fixed type tag
    pub log_type: String,

    /// Fixed syslog severity
    pub priority: u8,
}

/// Frames raw events into log records
#[derive(Debug, Clone)]
pub struct RecordFramer {
    log_type: String,
    priority: u8,
    timestamp_paths: Vec<Vec<String>>,
    type_paths: Vec<Vec<String>>,
}

impl RecordFramer {
    pub fn new(
        log_type: impl Into<String>,
        priority: u8,
        timestamp_paths: &[String],
        type_paths: &[String],
    ) -> Self {
        Self {
            log_type: log_type.into(),
            priority,
            timestamp_paths: timestamp_paths.iter().map(|p| split_path(p)).collect(),
            type_paths: type_paths.iter().map(|p| split_path(p)).collect(),
        }
    }

    pub fn from_config(config: &RecordConfig) -> Self {
        Self::new(
            config.log_type.as_str(),
            config.priority,
            &config.timestamp_paths,
            &config.type_paths,
        )
    }

    /// Frames a single event; never fails
    pub fn frame(&self, event: &Value) -> LogRecord {
        let timestamp = self
            .timestamp_paths
            .iter()
            .filter_map(|path| lookup(event, path))
            .find_map(parse_timestamp);

        let type_id = self
            .type_paths
            .iter()
            .filter_map(|path| lookup(event, path))
            .find_map(type_string);

        if timestamp.is_none() {
            tracing::debug!("No timestamp found in event; emitting record without one");
        }

        LogRecord {
            timestamp: timestamp.map(|(secs, _)| secs),
            timestamp_usec: timestamp.and_then(|(_, usec)| usec),
            type_id,
            message: event.to_string(),
            log_type: self.log_type.clone(),
            priority: self.priority,
        }
    }

    /// Frames events in order
    pub fn frame_all(&self, events: &[Value]) -> Vec<LogRecord> {
        events.iter().map(|event| self.frame(event)).collect()
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// Walks a dot-separated path; numeric segments index into arrays
fn lookup<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Parses RFC 3339 strings and numeric epoch seconds into (seconds, microseconds)
fn parse_timestamp(value: &Value) -> Option<(i64, Option<u32>)> {
    match value {
        Value::String(raw) => {
            let ts = DateTime::parse_from_rfc3339(raw).ok()?;
            let usec = ts.timestamp_subsec_micros();
            Some((ts.timestamp(), (usec > 0).then_some(usec)))
        }
        Value::Number(n) => {
            if let Some(secs) = n.as_i64() {
                return Some((secs, None));
            }
            let f = n.as_f64()?;
            // Floor keeps the microsecond part non-negative for pre-epoch times
            let secs = f.floor();
            let usec = ((f - secs) * 1_000_000.0).round() as u32;
            Some((secs as i64, (usec > 0).then_some(usec.min(999_999))))
        }
        _ => None,
    }
}

fn type_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
