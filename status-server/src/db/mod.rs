//! Repository functions over the shared SQLite schema
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC text so that string
//! comparison in SQL matches chronological order.

pub mod prompts;
pub mod submissions;
pub mod summaries;
pub mod teams;
pub mod users;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use status_common::{Error, Result};

/// Column text for a timestamp
pub fn fmt_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a timestamp column
pub fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

/// Parse a `YYYY-MM-DD` column
pub fn parse_date(value: &str, column: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
