//! Half-open time ranges on a single day

use chrono::{Duration, NaiveTime};
use shared::error::{AppError, ErrorCode};

use crate::utils::time::{format_time, parse_time};

/// `[start, end)` on one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeRange {
    /// Rejects empty and inverted ranges
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, AppError> {
        if end <= start {
            return Err(AppError::with_message(
                ErrorCode::InvalidTimeRange,
                format!(
                    "End time {} must be after start time {}",
                    format_time(end),
                    format_time(start)
                ),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, AppError> {
        Self::new(parse_time(start)?, parse_time(end)?)
    }

    /// Ranges touching at an endpoint do not overlap
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn start_str(&self) -> String {
        format_time(self.start)
    }

    pub fn end_str(&self) -> String {
        format_time(self.end)
    }

    /// Split into consecutive slots of `minutes`; a trailing partial slot is dropped.
    pub fn slots(&self, minutes: i64) -> Vec<TimeRange> {
        let mut slots = Vec::new();
        if minutes <= 0 {
            return slots;
        }
        let step = Duration::minutes(minutes);
        let mut start = self.start;
        loop {
            let (end, wrapped) = start.overflowing_add_signed(step);
            if wrapped != 0 || end > self.end || end <= start {
                break;
            }
            slots.push(TimeRange { start, end });
            start = end;
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: &str, end: &str) -> TimeRange {
        TimeRange::parse(start, end).unwrap()
    }

    #[test]
    fn test_rejects_inverted_and_empty() {
        assert_eq!(
            TimeRange::parse("10:00", "09:00").unwrap_err().code,
            ErrorCode::InvalidTimeRange
        );
        assert!(TimeRange::parse("10:00", "10:00").is_err());
    }

    #[test]
    fn test_overlap_is_half_open() {
        let a = range("09:00", "09:30");
        assert!(!a.overlaps(&range("09:30", "10:00")));
        assert!(!a.overlaps(&range("08:30", "09:00")));
        assert!(a.overlaps(&range("09:15", "09:45")));
        assert!(a.overlaps(&range("08:00", "12:00")));
        assert!(a.overlaps(&range("09:10", "09:20")));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let pairs = [
            (range("09:00", "10:00"), range("09:59", "11:00")),
            (range("09:00", "10:00"), range("10:00", "11:00")),
            (range("13:00", "14:00"), range("09:00", "10:00")),
        ];
        for (a, b) in pairs {
            assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }
    }

    #[test]
    fn test_slots() {
        let day = range("09:00", "10:40");
        let slots = day.slots(30);
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].start_str(), "09:00");
        assert_eq!(slots[2].end_str(), "10:30");
    }

    #[test]
    fn test_slots_stop_before_midnight() {
        let late = range("23:00", "23:59");
        assert_eq!(late.slots(30).len(), 1);
        assert!(late.slots(0).is_empty());
    }
}
