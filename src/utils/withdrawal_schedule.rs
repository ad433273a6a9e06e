use chrono::{DateTime, Datelike, FixedOffset, Utc, Weekday};

pub const PROCESSING_DAYS: &str = "Wednesdays & Sundays";
pub const CLOSED_MESSAGE: &str = "Withdrawals only allowed on Wednesdays and Sundays";

pub fn is_withdrawal_day(day: Weekday) -> bool {
    matches!(day, Weekday::Wed | Weekday::Sun)
}

/// The first withdrawal day on or after `day`.
pub fn next_withdrawal_day(day: Weekday) -> Weekday {
    match day {
        Weekday::Mon | Weekday::Tue | Weekday::Wed => Weekday::Wed,
        Weekday::Thu | Weekday::Fri | Weekday::Sat | Weekday::Sun => Weekday::Sun,
    }
}

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Weekday of `now` as seen at the platform's UTC offset.
pub fn local_weekday(now: DateTime<Utc>, offset_hours: i32) -> Weekday {
    match FixedOffset::east_opt(offset_hours * 3600) {
        Some(offset) => now.with_timezone(&offset).weekday(),
        None => now.weekday(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_withdrawal_days() {
        assert!(is_withdrawal_day(Weekday::Wed));
        assert!(is_withdrawal_day(Weekday::Sun));
        for day in [Weekday::Mon, Weekday::Tue, Weekday::Thu, Weekday::Fri, Weekday::Sat] {
            assert!(!is_withdrawal_day(day), "{:?} should be closed", day);
        }
    }

    #[test]
    fn test_next_withdrawal_day() {
        assert_eq!(next_withdrawal_day(Weekday::Mon), Weekday::Wed);
        assert_eq!(next_withdrawal_day(Weekday::Tue), Weekday::Wed);
        assert_eq!(next_withdrawal_day(Weekday::Wed), Weekday::Wed);
        assert_eq!(next_withdrawal_day(Weekday::Thu), Weekday::Sun);
        assert_eq!(next_withdrawal_day(Weekday::Sat), Weekday::Sun);
        assert_eq!(next_withdrawal_day(Weekday::Sun), Weekday::Sun);
        assert_eq!(day_name(next_withdrawal_day(Weekday::Mon)), "Wednesday");
    }

    #[test]
    fn test_local_weekday_uses_offset() {
        // Tuesday 22:30 UTC is already Wednesday in Nairobi (UTC+3)
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 22, 30, 0).unwrap();
        assert_eq!(local_weekday(now, 0), Weekday::Tue);
        assert_eq!(local_weekday(now, 3), Weekday::Wed);
    }
}
