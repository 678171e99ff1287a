// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the slot ledger, bookings, and conversation state.

pub mod bookings;
pub mod conversations;
pub mod slots;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

/// Parse an RFC 3339 column value.
pub(crate) fn parse_ts(idx: usize, raw: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse an epoch-milliseconds column value.
pub(crate) fn parse_millis(idx: usize, ms: i64) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {ms}").into(),
        )
    })
}

/// Parse a lowercase enum stored as text.
pub(crate) fn parse_enum<T: std::str::FromStr>(idx: usize, raw: &str) -> Result<T, rusqlite::Error>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
