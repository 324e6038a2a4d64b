//! The persisted note value type and its timestamp encoding.

use crate::{JotterError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column format for `notes.created_at`.
///
/// Matches SQLite's `CURRENT_TIMESTAMP` layout with millisecond precision
/// appended, so values written by the store sort lexically and rows created
/// with the column default still parse.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const TIMESTAMP_FORMAT_SECONDS: &str = "%Y-%m-%d %H:%M:%S";

/// A single note as stored in the `notes` table.
///
/// The presentation layer only ever holds clones of these; the store owns the rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    /// Surrogate key assigned by the store. Never reused within a store lifetime.
    pub id: i64,
    /// Unique, non-empty title. Lookups and mutations are keyed by it.
    pub title: String,
    /// Free text body; may be empty.
    pub content: String,
    /// Creation time, set once by the store.
    pub created_at: DateTime<Utc>,
}

/// Formats a timestamp for the `created_at` column.
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses a `created_at` column value written either by the store or by
/// SQLite's `CURRENT_TIMESTAMP` default.
pub(crate) fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT_SECONDS))
        .map(|naive| naive.and_utc())
        .map_err(|_| JotterError::InvalidTimestamp(raw.to_string()))
}

/// Trims a caller-supplied title and rejects blank ones.
pub(crate) fn normalize_title(title: &str) -> Result<&str> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(JotterError::EmptyTitle);
    }
    Ok(trimmed)
}
