//! Calendar arithmetic for stays.
//!
//! All instants are Unix millis; calendar dates are UTC. Nights are
//! counted by whole calendar dates, never by elapsed hours: an
//! evening arrival followed by a morning departure is one night.

use chrono::{DateTime, NaiveDate, Utc};

/// Calendar date (UTC) of a Unix-millis instant.
pub fn date_of_millis(millis: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

/// Nights spanned by a half-open `[check_in, check_out)` date range.
pub fn nights_between(check_in: NaiveDate, check_out: NaiveDate) -> i64 {
    (check_out - check_in).num_days()
}

/// Nights actually billed for a completed stay: the calendar-date
/// difference between arrival and departure instants, floored at 1.
/// A same-day check-in/check-out still bills one night.
pub fn billable_nights(actual_check_in: i64, actual_check_out: i64) -> i64 {
    let nights = nights_between(date_of_millis(actual_check_in), date_of_millis(actual_check_out));
    nights.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn millis(date: &str, hour: u32) -> i64 {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis()
    }

    #[test]
    fn test_nights_between() {
        let a = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 3, 4).unwrap();
        assert_eq!(nights_between(a, b), 3);
        assert_eq!(nights_between(a, a), 0);
    }

    #[test]
    fn test_one_night_despite_short_hours() {
        // Evening arrival, morning departure: 15 elapsed hours, 1 night.
        let check_in = millis("2026-03-01", 18);
        let check_out = millis("2026-03-02", 9);
        assert_eq!(billable_nights(check_in, check_out), 1);
    }

    #[test]
    fn test_same_day_bills_minimum_one_night() {
        let check_in = millis("2026-03-01", 10);
        let check_out = millis("2026-03-01", 14);
        assert_eq!(billable_nights(check_in, check_out), 1);
    }

    #[test]
    fn test_multi_night_count() {
        let check_in = millis("2026-03-01", 14);
        let check_out = millis("2026-03-05", 11);
        assert_eq!(billable_nights(check_in, check_out), 4);
    }
}
