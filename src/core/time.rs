use time::{format_description::well_known::Rfc3339, OffsetDateTime};

/// Renders remaining seconds as `mm:ss`; minutes are not wrapped into hours.
pub fn format_clock(seconds: Option<u64>) -> String {
    match seconds {
        Some(value) => format!("{:02}:{:02}", value / 60, value % 60),
        None => String::from("--:--"),
    }
}

pub fn is_time_critical(seconds: u64, threshold_seconds: u64) -> bool {
    seconds < threshold_seconds
}

pub(crate) fn format_offset(value: OffsetDateTime) -> String {
    value.format(&Rfc3339).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, PrimitiveDateTime, Time, UtcOffset};

    #[test]
    fn format_clock_pads_minutes_and_seconds() {
        assert_eq!(format_clock(Some(600)), "10:00");
        assert_eq!(format_clock(Some(450)), "07:30");
        assert_eq!(format_clock(Some(9)), "00:09");
        assert_eq!(format_clock(Some(0)), "00:00");
    }

    #[test]
    fn format_clock_keeps_long_exams_in_minutes() {
        assert_eq!(format_clock(Some(2 * 3600 + 5)), "120:05");
    }

    #[test]
    fn format_clock_placeholder_before_timer_is_known() {
        assert_eq!(format_clock(None), "--:--");
    }

    #[test]
    fn time_critical_below_threshold_only() {
        assert!(is_time_critical(299, 300));
        assert!(!is_time_critical(300, 300));
    }

    #[test]
    fn format_offset_preserves_offset() {
        let date = Date::from_calendar_date(2025, time::Month::January, 2).unwrap();
        let time = Time::from_hms(10, 20, 30).unwrap();
        let utc = PrimitiveDateTime::new(date, time).assume_utc();
        let offset = UtcOffset::from_hms(3, 0, 0).unwrap();
        let shifted = utc.to_offset(offset);
        assert_eq!(format_offset(shifted), "2025-01-02T13:20:30+03:00");
    }
}
