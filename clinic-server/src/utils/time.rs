//! Date and time-of-day parsing
//!
//! Appointment dates are stored as `YYYY-MM-DD` and times as `HH:MM`. Both
//! fixed-width forms sort lexicographically in the same order as in time,
//! which the overlap query relies on.

use chrono::{NaiveDate, NaiveTime};
use shared::error::{AppError, ErrorCode};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        AppError::with_message(
            ErrorCode::InvalidFormat,
            format!("Invalid date '{value}', expected YYYY-MM-DD"),
        )
    })
}

/// Parse `HH:MM` (seconds are accepted and dropped)
pub fn parse_time(value: &str) -> Result<NaiveTime, AppError> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| {
            AppError::with_message(
                ErrorCode::InvalidFormat,
                format!("Invalid time '{value}', expected HH:MM"),
            )
        })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Canonical `YYYY-MM-DD` form of a date string
pub fn canonical_date(value: &str) -> Result<String, AppError> {
    parse_date(value).map(format_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_accepts_seconds() {
        let t = parse_time("09:30:00").unwrap();
        assert_eq!(format_time(t), "09:30");
    }

    #[test]
    fn test_parse_time_pads() {
        let t = parse_time("9:05").unwrap();
        assert_eq!(format_time(t), "09:05");
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        let err = parse_time("25:00").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidFormat);
        assert!(parse_time("noon").is_err());
    }

    #[test]
    fn test_canonical_date() {
        assert_eq!(canonical_date("2026-03-02").unwrap(), "2026-03-02");
        assert!(canonical_date("02/03/2026").is_err());
        assert!(canonical_date("2026-02-30").is_err());
    }
}
