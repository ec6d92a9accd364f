use chrono::{DateTime, FixedOffset, TimeZone, Utc};

/// Vietnam has no daylight saving; a fixed UTC+7 offset is sufficient.
fn vietnam_offset() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).expect("+07:00 is a valid offset")
}

/// Calendar date (YYYY-MM-DD) in Vietnam time. Quota days roll over at
/// midnight Vietnam time, not UTC.
pub fn vietnam_today() -> String {
    vietnam_date_of(Utc::now())
}

pub fn vietnam_date_of(at: DateTime<Utc>) -> String {
    at.with_timezone(&vietnam_offset()).format("%Y-%m-%d").to_string()
}

/// Human readable Vietnam-time rendering of a millisecond timestamp, used
/// for spreadsheet rows and email bodies.
pub fn format_vietnam_time(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt
            .with_timezone(&vietnam_offset())
            .format("%d/%m/%Y %H:%M:%S")
            .to_string(),
        None => String::new(),
    }
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_vietnam_date_rolls_over_before_utc() {
        // 18:30 UTC is already 01:30 next day in Vietnam.
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 18, 30, 0).unwrap();
        assert_eq!(vietnam_date_of(at), "2024-01-02");

        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(vietnam_date_of(at), "2024-01-01");
    }

    #[test]
    fn test_format_vietnam_time() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 18, 30, 0).unwrap();
        assert_eq!(format_vietnam_time(at.timestamp_millis()), "02/01/2024 01:30:00");
        assert_eq!(format_vietnam_time(i64::MAX), "");
    }
}
