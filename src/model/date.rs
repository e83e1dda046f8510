use std::fmt;
use std::ops::Deref;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::RowValues;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f %:z"];

/// A timezone-aware point in time read from a date column.
///
/// Values without zone information are taken as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateTimeValue(DateTime<FixedOffset>);

impl DateTimeValue {
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().fixed_offset())
    }

    /// Parse `YYYY-MM-DD HH:MM:SS[.f]`, ISO-8601 / RFC 3339 (with or without
    /// offset) or a bare `YYYY-MM-DD`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self(dt));
        }
        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(raw, format) {
                return Some(Self(dt));
            }
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(Self::from_naive_utc(naive));
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .map(|date| Self::from_naive_utc(date.and_time(NaiveTime::MIN)))
    }

    #[must_use]
    pub fn from_naive_utc(naive: NaiveDateTime) -> Self {
        Self(Utc.from_utc_datetime(&naive).fixed_offset())
    }

    #[must_use]
    pub fn from_unix_seconds(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0)
            .single()
            .map(|dt| Self(dt.fixed_offset()))
    }

    /// Interpret a raw column value. `Ok(None)` for NULL, `Err(())` when the value is not a date.
    pub(crate) fn from_row_value(value: &RowValues) -> Result<Option<Self>, ()> {
        match value {
            RowValues::Null => Ok(None),
            RowValues::Timestamp(naive) => Ok(Some(Self::from_naive_utc(*naive))),
            RowValues::Text(text) => Self::parse(text).map(Some).ok_or(()),
            RowValues::Int(secs) => Self::from_unix_seconds(*secs).map(Some).ok_or(()),
            _ => Err(()),
        }
    }

    /// True if this moment lies before the current time.
    #[must_use]
    pub fn is_past(&self) -> bool {
        self.is_past_at(Utc::now())
    }

    /// True if this moment lies after the current time.
    #[must_use]
    pub fn is_future(&self) -> bool {
        self.is_future_at(Utc::now())
    }

    #[must_use]
    pub fn is_past_at(&self, now: DateTime<Utc>) -> bool {
        self.0 < now
    }

    #[must_use]
    pub fn is_future_at(&self, now: DateTime<Utc>) -> bool {
        self.0 > now
    }

    #[must_use]
    pub fn to_utc(&self) -> DateTime<Utc> {
        self.0.with_timezone(&Utc)
    }

    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    #[must_use]
    pub fn into_inner(self) -> DateTime<FixedOffset> {
        self.0
    }
}

impl Deref for DateTimeValue {
    type Target = DateTime<FixedOffset>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d %H:%M:%S%:z"))
    }
}

impl From<DateTime<Utc>> for DateTimeValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for DateTimeValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn parses_space_separated_timestamp_as_utc() {
        let dt = DateTimeValue::parse("2020-11-28 11:42:07").unwrap();
        assert_eq!(dt.year(), 2020);
        assert_eq!(dt.hour(), 11);
        assert_eq!(dt.offset().local_minus_utc(), 0);
    }

    #[test]
    fn parses_fractional_and_iso_forms() {
        assert!(DateTimeValue::parse("2020-11-28 11:42:07.123").is_some());
        assert!(DateTimeValue::parse("2020-11-28T11:42:07").is_some());
        assert!(DateTimeValue::parse("2020-11-28").is_some());
    }

    #[test]
    fn keeps_explicit_offset() {
        let dt = DateTimeValue::parse("2020-11-28T11:42:07+02:00").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 2 * 3600);
        assert_eq!(dt.to_utc().hour(), 9);
    }

    #[test]
    fn rejects_garbage() {
        assert!(DateTimeValue::parse("next tuesday").is_none());
        assert!(DateTimeValue::parse("").is_none());
    }

    #[test]
    fn past_and_future_against_fixed_clock() {
        let dt = DateTimeValue::parse("2020-11-28 11:42:07").unwrap();
        assert!(dt.is_past_at(at("2020-11-28T11:42:08Z")));
        assert!(!dt.is_past_at(at("2020-11-28T11:42:06Z")));
        assert!(dt.is_future_at(at("2019-01-01T00:00:00Z")));
        assert!(dt.is_past());
    }

    #[test]
    fn row_values_convert() {
        assert_eq!(DateTimeValue::from_row_value(&RowValues::Null), Ok(None));
        let naive = NaiveDate::from_ymd_opt(2020, 11, 28)
            .unwrap()
            .and_hms_opt(11, 42, 7)
            .unwrap();
        let from_naive = DateTimeValue::from_row_value(&RowValues::Timestamp(naive))
            .unwrap()
            .unwrap();
        assert_eq!(from_naive, DateTimeValue::parse("2020-11-28 11:42:07").unwrap());
        assert!(DateTimeValue::from_row_value(&RowValues::Int(0)).unwrap().is_some());
        assert!(DateTimeValue::from_row_value(&RowValues::Bool(true)).is_err());
    }
}
