use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// A half-open time interval [start, end) on a single calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Slot {
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> CoreResult<Self> {
        if end <= start {
            return Err(CoreError::Validation(
                "end time must be after start time".to_string(),
            ));
        }
        Ok(Self { date, start, end })
    }

    /// Build a slot from the wire formats the HTTP layer hands over
    /// (`YYYY-MM-DD` date, `HH:MM` times).
    pub fn parse(date: &str, start: &str, end: &str) -> CoreResult<Self> {
        Self::new(parse_date(date)?, parse_time(start)?, parse_time(end)?)
    }

    /// Half-open overlap: two slots conflict iff they share a date and
    /// `a.start < b.end && b.start < a.end`. A slot starting exactly when
    /// another ends does not conflict.
    pub fn overlaps(&self, other: &Slot) -> bool {
        self.date == other.date && self.start < other.end && other.start < self.end
    }
}

pub fn parse_date(value: &str) -> CoreResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| CoreError::Validation("invalid date format, use YYYY-MM-DD".to_string()))
}

pub fn parse_time(value: &str) -> CoreResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| CoreError::Validation("invalid time format, use HH:MM".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(date: &str, start: &str, end: &str) -> Slot {
        Slot::parse(date, start, end).unwrap()
    }

    #[test]
    fn test_rejects_inverted_interval() {
        assert!(Slot::parse("2024-06-10", "11:00", "10:00").is_err());
        assert!(Slot::parse("2024-06-10", "10:00", "10:00").is_err());
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(Slot::parse("2024/06/10", "10:00", "11:00").is_err());
        assert!(Slot::parse("2024-06-10", "10am", "11:00").is_err());
    }

    #[test]
    fn test_back_to_back_slots_do_not_overlap() {
        let a = slot("2024-06-10", "10:00", "11:00");
        let b = slot("2024-06-10", "11:00", "12:00");
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_partial_overlap() {
        let a = slot("2024-06-10", "10:00", "11:00");
        let b = slot("2024-06-10", "10:30", "11:30");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_containment_and_equality_overlap() {
        let outer = slot("2024-06-10", "09:00", "12:00");
        let inner = slot("2024-06-10", "10:00", "11:00");
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
        assert!(inner.overlaps(&inner.clone()));
    }

    #[test]
    fn test_different_dates_never_overlap() {
        let a = slot("2024-06-10", "10:00", "11:00");
        let b = slot("2024-06-11", "10:00", "11:00");
        assert!(!a.overlaps(&b));
    }
}
