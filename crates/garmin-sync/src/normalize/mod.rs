//! Payload normalization
//!
//! Pure transformations from raw Connect API payloads into the canonical
//! records in [`crate::models`]. No I/O happens here; malformed individual
//! samples are dropped, and a payload without its primary value yields
//! nothing at all so the day stays eligible for retry.

pub mod activity;
pub mod heart_rate;
pub mod hrv;
pub mod respiration;
pub mod sleep;
pub mod spo2;
pub mod stress;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// Convert an epoch-millisecond timestamp to a UTC instant
pub(crate) fn datetime_from_ms(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(ms)
}

/// Epoch-millisecond JSON value (integer or float) to a UTC instant
pub(crate) fn datetime_from_ms_value(value: &Value) -> Option<DateTime<Utc>> {
    value.as_f64().and_then(|ms| datetime_from_ms(ms as i64))
}

/// Parse a provider GMT timestamp string, with and without sub-second
/// precision ("2024-01-01T08:00:00.0" or "2024-01-01T08:00:00")
pub(crate) fn parse_gmt_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S.%f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Integer field that may arrive as either a JSON integer or float
pub(crate) fn int_field(value: &Value, key: &str) -> Option<i64> {
    let v = value.get(key)?;
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

/// String field
pub(crate) fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}
