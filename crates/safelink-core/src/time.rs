//! Timestamp normalization for API payloads.
//!
//! The alert API emits ISO 8601 timestamps that sometimes omit the
//! timezone designator (`2026-03-01T09:15:00.123456`). Those are UTC.
//! Everything in this crate works on `DateTime<Utc>`; this module is the
//! only place that deals with the wire strings.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serializer};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimeError {
    #[error("unrecognised timestamp: {0:?}")]
    Unrecognised(String),
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an API timestamp, assuming UTC when no designator is present.
///
/// An empty string maps to the Unix epoch so that records with a missing
/// timestamp sort last instead of failing the whole payload.
pub fn parse_api_timestamp(value: &str) -> Result<DateTime<Utc>, TimeError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(DateTime::<Utc>::UNIX_EPOCH);
    }

    if has_timezone(value) {
        return DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| TimeError::Unrecognised(value.to_string()));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| TimeError::Unrecognised(value.to_string()))
}

/// True if the string ends in `Z` or a `±HH:MM` offset.
fn has_timezone(value: &str) -> bool {
    if value.ends_with('Z') || value.ends_with('z') {
        return true;
    }
    let bytes = value.as_bytes();
    if bytes.len() < 6 {
        return false;
    }
    let tail = &bytes[bytes.len() - 6..];
    matches!(tail[0], b'+' | b'-')
        && tail[1].is_ascii_digit()
        && tail[2].is_ascii_digit()
        && tail[3] == b':'
        && tail[4].is_ascii_digit()
        && tail[5].is_ascii_digit()
}

/// Serde adapter for API timestamp fields.
pub mod api_timestamp {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_api_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn naive_timestamp_is_utc() {
        let naive = parse_api_timestamp("2026-01-01T10:00:00").unwrap();
        let zulu = parse_api_timestamp("2026-01-01T10:00:00Z").unwrap();
        assert_eq!(naive, zulu);
        assert_eq!(naive.hour(), 10);
    }

    #[test]
    fn fractional_seconds_without_designator() {
        let dt = parse_api_timestamp("2026-03-01T09:15:00.123456").unwrap();
        assert_eq!(dt.nanosecond(), 123_456_000);
    }

    #[test]
    fn space_separator_accepted() {
        let dt = parse_api_timestamp("2026-03-01 09:15:00").unwrap();
        assert_eq!(dt, parse_api_timestamp("2026-03-01T09:15:00Z").unwrap());
    }

    #[test]
    fn offset_is_honoured() {
        let dt = parse_api_timestamp("2026-01-01T12:00:00+02:00").unwrap();
        assert_eq!(dt, parse_api_timestamp("2026-01-01T10:00:00Z").unwrap());
    }

    #[test]
    fn empty_is_epoch() {
        assert_eq!(parse_api_timestamp("").unwrap(), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(parse_api_timestamp("   ").unwrap(), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(
            parse_api_timestamp("yesterday"),
            Err(TimeError::Unrecognised("yesterday".into()))
        );
    }

    #[test]
    fn date_with_negative_offset_not_mistaken_for_naive() {
        // The date part contains '-' characters; only the tail counts.
        assert!(!has_timezone("2026-01-01T10:00:00"));
        assert!(has_timezone("2026-01-01T10:00:00-05:00"));
    }
}
