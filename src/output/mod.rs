//! Output module for framed log records
//!
//! This module turns raw upstream events into log records and writes them out as
//! JSON lines. Delivering the lines anywhere further is the host's concern.

mod record;

pub use record::{LogRecord, RecordFramer};

use crate::Result;
use std::io::Write;

/// Writes records as newline-delimited JSON
///
/// # Returns
///
/// The number of records written
pub fn write_json_lines<W: Write>(writer: &mut W, records: &[LogRecord]) -> Result<usize> {
    for record in records {
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(records.len())
}
