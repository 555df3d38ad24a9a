//! ISO-8601 timestamps as stored by both backends.

use chrono::{DateTime, Duration, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `SQLite` `CURRENT_TIMESTAMP` layout, accepted when reading old rows.
const SQLITE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An ISO-8601 UTC timestamp with millisecond precision.
///
/// Stored verbatim as a string (`2026-10-18T09:30:00.125Z`). Values written
/// by other tools may be malformed; [`Timestamp::sort_key`] maps those to the
/// epoch instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Wraps a raw timestamp string without validating it.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the current time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Formats a `DateTime` in the canonical layout.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Returns a timestamp strictly later than `previous`.
    ///
    /// Uses the current time unless the clock has not moved past `previous`
    /// at millisecond resolution, in which case `previous + 1ms` is used.
    #[must_use]
    pub fn after(previous: &Self) -> Self {
        let now = Utc::now();
        match previous.parse() {
            Some(prev) if now.timestamp_millis() <= prev.timestamp_millis() => {
                Self::from_datetime(prev + Duration::milliseconds(1))
            },
            _ => Self::from_datetime(now),
        }
    }

    /// Returns the raw string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the timestamp, accepting RFC 3339 and `SQLite` datetime text.
    #[must_use]
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.0)
            .map(|at| at.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&self.0, SQLITE_DATETIME_FORMAT)
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    /// Milliseconds since the epoch, or 0 when missing or unparseable.
    #[must_use]
    pub fn sort_key(&self) -> i64 {
        self.parse().map_or(0, |at| at.timestamp_millis())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Self::from_datetime(at)
    }
}

impl From<String> for Timestamp {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_canonical_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
        let ts = Timestamp::from_datetime(at);
        assert_eq!(ts.as_str(), "2026-10-18T09:30:00.000Z");
        assert_eq!(ts.parse(), Some(at));
    }

    #[test]
    fn test_parses_sqlite_current_timestamp() {
        let ts = Timestamp::new("2025-01-02 03:04:05");
        let expected = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(ts.parse(), Some(expected));
    }

    #[test]
    fn test_unparseable_sorts_as_epoch() {
        assert_eq!(Timestamp::new("yesterday-ish").sort_key(), 0);
        assert_eq!(Timestamp::default().sort_key(), 0);
    }

    #[test]
    fn test_after_is_strictly_later() {
        let future = Timestamp::from_datetime(Utc::now() + Duration::seconds(60));
        let next = Timestamp::after(&future);
        assert_eq!(next.sort_key(), future.sort_key() + 1);

        let past = Timestamp::new("2001-01-01T00:00:00.000Z");
        let next = Timestamp::after(&past);
        assert!(next.sort_key() > past.sort_key());
    }

    #[test]
    fn test_after_unparseable_uses_now() {
        let next = Timestamp::after(&Timestamp::new("garbage"));
        assert!(next.parse().is_some());
    }
}
