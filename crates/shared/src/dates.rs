//! Date boundary parsing and time-window arithmetic.
//!
//! Request boundaries arrive as calendar dates in one of two textual formats
//! and are widened to instants: a lower boundary becomes the start of its day,
//! an upper boundary becomes the last second of its day, so that a window is
//! inclusive on both ends. Record timestamps use a fixed ISO-like pattern with
//! a literal `Z` suffix and are always treated as UTC.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pattern used by record timestamps in the upstream store.
const RECORD_TIMESTAMP_PATTERN: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Minute-precision pattern used when rendering dates into exports.
const MINUTE_PATTERN: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("invalid date boundary '{value}', expected {expected}")]
    InvalidBoundary { value: String, expected: &'static str },
    #[error("date range start {lower} is after end {upper}")]
    InvalidRange {
        lower: DateTime<Utc>,
        upper: DateTime<Utc>,
    },
    #[error("invalid record timestamp '{0}'")]
    InvalidTimestamp(String),
}

/// Textual format accepted for request date boundaries.
///
/// Endpoints are configured with exactly one of these; a boundary that does
/// not match the configured format is rejected, never reinterpreted in the
/// other one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryFormat {
    /// `DD/MM/YYYY`
    DayMonthYear,
    /// `YYYY-MM-DD`
    Iso,
}

impl BoundaryFormat {
    fn pattern(self) -> &'static str {
        match self {
            BoundaryFormat::DayMonthYear => "%d/%m/%Y",
            BoundaryFormat::Iso => "%Y-%m-%d",
        }
    }

    fn expected(self) -> &'static str {
        match self {
            BoundaryFormat::DayMonthYear => "DD/MM/YYYY",
            BoundaryFormat::Iso => "YYYY-MM-DD",
        }
    }

    fn parse_date(self, value: &str) -> Result<NaiveDate, DateError> {
        NaiveDate::parse_from_str(value.trim(), self.pattern()).map_err(|_| {
            DateError::InvalidBoundary {
                value: value.to_string(),
                expected: self.expected(),
            }
        })
    }
}

/// Parses a lower boundary into the first instant of its day (00:00:00 UTC).
pub fn parse_lower_boundary(value: &str, format: BoundaryFormat) -> Result<DateTime<Utc>, DateError> {
    let date = format.parse_date(value)?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

/// Parses an upper boundary into the last second of its day (23:59:59 UTC).
///
/// The widening keeps the window inclusive: a record stamped anywhere on the
/// named day is inside, the first instant of the next day is outside.
pub fn parse_upper_boundary(value: &str, format: BoundaryFormat) -> Result<DateTime<Utc>, DateError> {
    let date = format.parse_date(value)?;
    let start = date.and_time(NaiveTime::MIN).and_utc();
    Ok(start + Duration::days(1) - Duration::seconds(1))
}

/// Parses a record timestamp (`%Y-%m-%dT%H:%M:%S%.fZ`, UTC).
pub fn parse_record_timestamp(value: &str) -> Result<DateTime<Utc>, DateError> {
    NaiveDateTime::parse_from_str(value, RECORD_TIMESTAMP_PATTERN)
        .map(|naive| naive.and_utc())
        .map_err(|_| DateError::InvalidTimestamp(value.to_string()))
}

/// Renders an instant at minute precision for export cells.
pub fn format_minute(instant: &DateTime<Utc>) -> String {
    instant.format(MINUTE_PATTERN).to_string()
}

/// Renders an instant in the record-store timestamp format with zeroed
/// milliseconds, the shape used when writing snapshot records upstream.
pub fn format_record_timestamp(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S.000Z").to_string()
}

/// Inclusive time window over a record timestamp field.
///
/// Either end may be absent; a window with no ends matches everything and is
/// reported as inactive so callers can skip timestamp parsing entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    lower: Option<DateTime<Utc>>,
    upper: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Builds a window, rejecting a lower bound above the upper bound.
    pub fn new(
        lower: Option<DateTime<Utc>>,
        upper: Option<DateTime<Utc>>,
    ) -> Result<Self, DateError> {
        if let (Some(l), Some(u)) = (lower, upper) {
            if l > u {
                return Err(DateError::InvalidRange { lower: l, upper: u });
            }
        }
        Ok(Self { lower, upper })
    }

    /// True when at least one boundary is set.
    pub fn is_active(&self) -> bool {
        self.lower.is_some() || self.upper.is_some()
    }

    /// True when the instant lies within the window, both ends inclusive.
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.lower.map_or(true, |l| *instant >= l) && self.upper.map_or(true, |u| *instant <= u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lower_boundary_day_month_year() {
        let parsed = parse_lower_boundary("15/03/2024", BoundaryFormat::DayMonthYear).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-15T00:00:00+00:00");
    }

    #[test]
    fn test_parse_lower_boundary_iso() {
        let parsed = parse_lower_boundary("2024-03-15", BoundaryFormat::Iso).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-15T00:00:00+00:00");
    }

    #[test]
    fn test_parse_upper_boundary_is_end_of_day() {
        let parsed = parse_upper_boundary("15/03/2024", BoundaryFormat::DayMonthYear).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-15T23:59:59+00:00");
    }

    #[test]
    fn test_parse_upper_boundary_iso_end_of_day() {
        let parsed = parse_upper_boundary("2024-12-31", BoundaryFormat::Iso).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-12-31T23:59:59+00:00");
    }

    #[test]
    fn test_boundary_formats_are_not_interchangeable() {
        assert!(parse_lower_boundary("2024-03-15", BoundaryFormat::DayMonthYear).is_err());
        assert!(parse_lower_boundary("15/03/2024", BoundaryFormat::Iso).is_err());
    }

    #[test]
    fn test_nonexistent_calendar_date_rejected() {
        // February has no 31st; this must be an error, not a silent rollover.
        let err = parse_lower_boundary("31/02/2024", BoundaryFormat::DayMonthYear).unwrap_err();
        assert!(matches!(err, DateError::InvalidBoundary { .. }));
        assert!(parse_upper_boundary("2023-02-29", BoundaryFormat::Iso).is_err());
    }

    #[test]
    fn test_boundary_error_names_expected_format() {
        let err = parse_lower_boundary("garbage", BoundaryFormat::DayMonthYear).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid date boundary 'garbage', expected DD/MM/YYYY"
        );
    }

    #[test]
    fn test_boundary_trims_whitespace() {
        let parsed = parse_lower_boundary(" 01/01/2024 ", BoundaryFormat::DayMonthYear).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_record_timestamp() {
        let parsed = parse_record_timestamp("2024-03-15T10:30:45.123Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-15T10:30:45.123+00:00");
    }

    #[test]
    fn test_parse_record_timestamp_zero_millis() {
        let parsed = parse_record_timestamp("2024-03-15T10:30:45.000Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-15T10:30:45+00:00");
    }

    #[test]
    fn test_parse_record_timestamp_rejects_other_shapes() {
        assert!(parse_record_timestamp("2024-03-15").is_err());
        assert!(parse_record_timestamp("2024-03-15 10:30:45").is_err());
        assert!(parse_record_timestamp("15/03/2024T10:30:45.000Z").is_err());
        assert!(parse_record_timestamp("not a date").is_err());
        assert!(parse_record_timestamp("").is_err());
    }

    #[test]
    fn test_format_minute() {
        let instant = parse_record_timestamp("2024-03-15T10:30:45.123Z").unwrap();
        assert_eq!(format_minute(&instant), "2024-03-15 10:30");
    }

    #[test]
    fn test_format_record_timestamp_zeroes_millis() {
        let instant = parse_record_timestamp("2024-03-15T10:30:45.789Z").unwrap();
        assert_eq!(format_record_timestamp(&instant), "2024-03-15T10:30:45.000Z");
    }

    #[test]
    fn test_window_rejects_inverted_range() {
        let lower = parse_lower_boundary("2024-03-20", BoundaryFormat::Iso).unwrap();
        let upper = parse_upper_boundary("2024-03-10", BoundaryFormat::Iso).unwrap();
        let err = TimeWindow::new(Some(lower), Some(upper)).unwrap_err();
        assert!(matches!(err, DateError::InvalidRange { .. }));
    }

    #[test]
    fn test_window_single_day_is_inclusive_both_ends() {
        let lower = parse_lower_boundary("2024-03-15", BoundaryFormat::Iso).unwrap();
        let upper = parse_upper_boundary("2024-03-15", BoundaryFormat::Iso).unwrap();
        let window = TimeWindow::new(Some(lower), Some(upper)).unwrap();

        let first = parse_record_timestamp("2024-03-15T00:00:00.000Z").unwrap();
        let last = parse_record_timestamp("2024-03-15T23:59:59.000Z").unwrap();
        let next_day = parse_record_timestamp("2024-03-16T00:00:00.000Z").unwrap();
        assert!(window.contains(&first));
        assert!(window.contains(&last));
        assert!(!window.contains(&next_day));
    }

    #[test]
    fn test_window_upper_only() {
        let upper = parse_upper_boundary("2024-03-15", BoundaryFormat::Iso).unwrap();
        let window = TimeWindow::new(None, Some(upper)).unwrap();

        let way_before = parse_record_timestamp("1999-01-01T00:00:00.000Z").unwrap();
        let last_second = parse_record_timestamp("2024-03-15T23:59:59.000Z").unwrap();
        let after = parse_record_timestamp("2024-03-16T00:00:00.000Z").unwrap();
        assert!(window.contains(&way_before));
        assert!(window.contains(&last_second));
        assert!(!window.contains(&after));
    }

    #[test]
    fn test_window_without_bounds_matches_everything_and_is_inactive() {
        let window = TimeWindow::new(None, None).unwrap();
        assert!(!window.is_active());
        let any = parse_record_timestamp("2024-03-15T12:00:00.000Z").unwrap();
        assert!(window.contains(&any));
    }

    #[test]
    fn test_window_with_one_bound_is_active() {
        let lower = parse_lower_boundary("2024-03-15", BoundaryFormat::Iso).unwrap();
        assert!(TimeWindow::new(Some(lower), None).unwrap().is_active());
    }

    #[test]
    fn test_boundary_format_config_spelling() {
        let fmt: BoundaryFormat = serde_json::from_str("\"day-month-year\"").unwrap();
        assert_eq!(fmt, BoundaryFormat::DayMonthYear);
        let fmt: BoundaryFormat = serde_json::from_str("\"iso\"").unwrap();
        assert_eq!(fmt, BoundaryFormat::Iso);
    }
}
