//! Time parsing and wallclock arithmetic shared by the classifiers and the
//! wave catalog.
//!
//! Two representations are used throughout the engine: local wallclock
//! [`chrono::NaiveTime`] for comparisons within one day, and
//! absolute simulated [`chrono::NaiveDateTime`] for wave deadlines. The two
//! are never mixed directly; conversion happens only at wave derivation.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::error::{EngineError, EngineResult};

/// Parses a route-schedule time field. Accepts a 2-4 digit integer string
/// (`"855"` -> 08:55, `"85"` -> 00:85 is invalid and rejected, `"8"` is
/// treated as `0` hours `MM` minutes only when it has exactly 1-2 digits)
/// or a literal `HH:MM[:SS]` string.
///
/// Mirrors the original `_parse_time_number`: a 1-2 digit numeric value is
/// minutes-only with hour 0; a 3-4 digit value splits into `HH` and `MM` by
/// `value / 100` and `value % 100`.
pub fn parse_hhmm(raw: &str) -> EngineResult<NaiveTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EngineError::TimeParseError {
            raw: raw.to_string(),
            reason: "empty time field".to_string(),
        });
    }

    if trimmed.contains(':') {
        return parse_hms(trimmed);
    }

    let trimmed = trimmed.split('.').next().unwrap_or(trimmed);
    let value: i64 = trimmed.parse().map_err(|_| EngineError::TimeParseError {
        raw: raw.to_string(),
        reason: "not a digit string".to_string(),
    })?;

    let (hour, minute) = if value < 100 {
        (0, value)
    } else {
        (value / 100, value % 100)
    };

    NaiveTime::from_hms_opt(hour as u32, minute as u32, 0).ok_or_else(|| EngineError::TimeParseError {
        raw: raw.to_string(),
        reason: format!("{hour}:{minute:02} out of range"),
    })
}

/// Parses `HH:MM[:SS]`.
pub fn parse_hms(raw: &str) -> EngineResult<NaiveTime> {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    if parts.len() < 2 {
        return Err(EngineError::TimeParseError {
            raw: raw.to_string(),
            reason: "expected HH:MM[:SS]".to_string(),
        });
    }
    let hour: u32 = parts[0].parse().map_err(|_| EngineError::TimeParseError {
        raw: raw.to_string(),
        reason: "bad hour".to_string(),
    })?;
    let minute: u32 = parts[1].parse().map_err(|_| EngineError::TimeParseError {
        raw: raw.to_string(),
        reason: "bad minute".to_string(),
    })?;
    let second: u32 = match parts.get(2) {
        Some(s) => s.parse().map_err(|_| EngineError::TimeParseError {
            raw: raw.to_string(),
            reason: "bad second".to_string(),
        })?,
        None => 0,
    };
    NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| EngineError::TimeParseError {
        raw: raw.to_string(),
        reason: format!("{hour}:{minute:02}:{second:02} out of range"),
    })
}

/// Result of [`available_minutes`]: either a minute count, or a rejection
/// reason (rejected as invalid, `time_invalid=true`).
pub enum AvailableMinutes {
    Minutes(i64),
    Invalid,
}

/// Computes available working minutes between an order time and a
/// delivery time:
///
/// - if `delivery >= order` (same day), straightforward subtraction;
/// - if `delivery < order` and the gap exceeds 6 hours, reject;
/// - only treat as cross-midnight if `order.hour >= 20 && delivery.hour <= 12`.
pub fn available_minutes(order_time: NaiveTime, delivery_time: NaiveTime) -> AvailableMinutes {
    let order_seconds = seconds_since_midnight(order_time);
    let delivery_seconds = seconds_since_midnight_minute_precision(delivery_time);

    if delivery_seconds >= order_seconds {
        return AvailableMinutes::Minutes((delivery_seconds - order_seconds) / 60);
    }

    let gap_hours = (order_seconds - delivery_seconds) as f64 / 3600.0;
    if gap_hours > 6.0 {
        return AvailableMinutes::Invalid;
    }

    if order_time.hour() >= 20 && delivery_time.hour() <= 12 {
        let available_seconds = (24 * 3600 - order_seconds) + delivery_seconds;
        AvailableMinutes::Minutes(available_seconds.max(0) / 60)
    } else {
        AvailableMinutes::Invalid
    }
}

fn seconds_since_midnight(t: NaiveTime) -> i64 {
    t.hour() as i64 * 3600 + t.minute() as i64 * 60 + t.second() as i64
}

/// Delivery/cutoff fields in the timetable carry no seconds component.
fn seconds_since_midnight_minute_precision(t: NaiveTime) -> i64 {
    t.hour() as i64 * 3600 + t.minute() as i64 * 60
}

use chrono::Timelike;

/// `is_late = order_time > cutoff` (same-day wallclock comparison).
pub fn is_late(order_time: NaiveTime, cutoff: NaiveTime) -> bool {
    order_time > cutoff
}

/// `true` for Saturday/Sunday; `is_workday` is `weekday < 5`.
pub fn is_workday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Combines a calendar date with a wallclock time into an absolute
/// simulated datetime.
pub fn combine(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    NaiveDateTime::new(date, time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_numeric_as_minutes_only() {
        let t = parse_hhmm("45").unwrap();
        assert_eq!(t, NaiveTime::from_hms_opt(0, 45, 0).unwrap());
    }

    #[test]
    fn parses_four_digit_numeric() {
        let t = parse_hhmm("1350").unwrap();
        assert_eq!(t, NaiveTime::from_hms_opt(13, 50, 0).unwrap());
    }

    #[test]
    fn parses_colon_form() {
        let t = parse_hhmm("08:55").unwrap();
        assert_eq!(t, NaiveTime::from_hms_opt(8, 55, 0).unwrap());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(parse_hhmm("2599").is_err());
    }

    #[test]
    fn same_day_subtraction() {
        let order = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let delivery = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        match available_minutes(order, delivery) {
            AvailableMinutes::Minutes(m) => assert_eq!(m, 60),
            AvailableMinutes::Invalid => panic!("expected minutes"),
        }
    }

    #[test]
    fn equal_order_and_cutoff_accepted_not_late() {
        let order = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        let cutoff = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        assert!(!is_late(order, cutoff));
    }

    #[test]
    fn gap_over_six_hours_rejected() {
        let order = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        let delivery = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        assert!(matches!(available_minutes(order, delivery), AvailableMinutes::Invalid));
    }

    #[test]
    fn cross_midnight_accepted_when_late_order_and_early_delivery() {
        let order = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
        let delivery = NaiveTime::from_hms_opt(7, 0, 0).unwrap();
        match available_minutes(order, delivery) {
            AvailableMinutes::Minutes(m) => assert_eq!(m, 8 * 60),
            AvailableMinutes::Invalid => panic!("expected cross-midnight minutes"),
        }
    }

    #[test]
    fn weekend_detection() {
        let sat = NaiveDate::from_ymd_opt(2026, 7, 25).unwrap();
        let mon = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        assert!(!is_workday(sat));
        assert!(is_workday(mon));
    }
}
