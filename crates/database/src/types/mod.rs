//! Shared types and result types for the database layer

pub mod errors;

use chrono::{DateTime, SecondsFormat, Utc};

pub use errors::DatabaseError;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Format a timestamp the way every table stores it.
///
/// Fixed-width UTC with microseconds, so lexical order in SQL matches
/// chronological order.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time in storage format.
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Parse any RFC 3339 timestamp and normalise it to storage format.
pub fn normalize_timestamp(value: &str) -> DatabaseResult<String> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| format_timestamp(parsed.with_timezone(&Utc)))
        .map_err(|e| DatabaseError::invalid_value(format!("invalid timestamp {value}: {e}")))
}
