use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone};

/// This is the standard way of converting a date to a string in leettrack.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Returns start of the next day. When midnight doesn't exist in the timezone (DST gap) the
/// earliest valid moment of the next day is used instead.
pub fn next_day_start<Tz: TimeZone>(date: &DateTime<Tz>) -> DateTime<Tz> {
    let tomorrow = date.date_naive() + Days::new(1);
    let timezone = date.timezone();
    let midnight = tomorrow.and_time(NaiveTime::MIN);
    timezone
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            timezone
                .from_local_datetime(&(midnight + TimeDelta::hours(1)))
                .earliest()
        })
        .unwrap_or_else(|| date.clone() + TimeDelta::days(1))
}

/// Time left until the next local midnight.
pub fn until_next_day<Tz: TimeZone>(date: &DateTime<Tz>) -> TimeDelta {
    next_day_start(date).signed_duration_since(date.clone())
}

/// Formats milliseconds as `HH:MM:SS`. Hours are not wrapped, so a day and a half reads as
/// `36:00:00`.
pub fn format_duration(ms: u64) -> String {
    let seconds = (ms / 1000) % 60;
    let minutes = (ms / (1000 * 60)) % 60;
    let hours = ms / (1000 * 60 * 60);
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Converts a possibly negative delta into whole milliseconds, clamped at zero.
pub fn delta_ms(delta: TimeDelta) -> u64 {
    delta.num_milliseconds().max(0) as u64
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeDelta, TimeZone, Utc};

    use super::{date_to_record_name, delta_ms, format_duration, next_day_start, until_next_day};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(3_661_000), "01:01:01");
        assert_eq!(format_duration(999), "00:00:00");
        assert_eq!(format_duration(59_999), "00:00:59");
        assert_eq!(format_duration(36 * 60 * 60 * 1000), "36:00:00");
    }

    #[test]
    fn test_record_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(date_to_record_name(date), "2024-03-09");
    }

    #[test]
    fn test_next_day_start_respects_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let now = offset.with_ymd_and_hms(2024, 12, 31, 23, 30, 0).unwrap();
        let midnight = next_day_start(&now);
        assert_eq!(midnight, offset.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(until_next_day(&now), TimeDelta::minutes(30));
    }

    #[test]
    fn test_until_next_day_at_midnight_is_full_day() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(until_next_day(&now), TimeDelta::days(1));
    }

    #[test]
    fn test_delta_clamped() {
        assert_eq!(delta_ms(TimeDelta::milliseconds(-5)), 0);
        assert_eq!(delta_ms(TimeDelta::seconds(2)), 2000);
    }
}
