use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Parses "2026-10-17"
pub fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw?.trim(), "%Y-%m-%d").ok()
}

/// Parses "19:30:00" or "19:30"
pub fn parse_time(raw: Option<&str>) -> Option<NaiveTime> {
    let raw = raw?.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Splits a local ISO timestamp ("2026-10-17T19:30:00") into date and time
pub fn parse_local_datetime(raw: Option<&str>) -> (Option<NaiveDate>, Option<NaiveTime>) {
    let Some(raw) = raw.map(str::trim) else {
        return (None, None);
    };

    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        Ok(dt) => (Some(dt.date()), Some(dt.time())),
        Err(_) => (parse_date(raw.get(..10)), None),
    }
}

/// Formats an event date for display: "Sat, Oct 17, 2026 · 7:30 PM".
/// Without a parsable date the raw value (or "Date TBA") is shown.
pub fn format_event_date(
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    raw: Option<&str>,
) -> String {
    match (date, time) {
        (Some(date), Some(time)) => format!(
            "{} · {}",
            date.format("%a, %b %-d, %Y"),
            time.format("%-I:%M %p")
        ),
        (Some(date), None) => date.format("%a, %b %-d, %Y").to_string(),
        (None, _) => raw
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or("Date TBA")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_date_and_time() {
        let date = parse_date(Some("2026-10-17"));
        let time = parse_time(Some("19:30:00"));
        assert_eq!(format_event_date(date, time, None), "Sat, Oct 17, 2026 · 7:30 PM");
    }

    #[test]
    fn test_format_date_only() {
        let date = parse_date(Some("2026-01-05"));
        assert_eq!(format_event_date(date, None, None), "Mon, Jan 5, 2026");
    }

    #[test]
    fn test_format_falls_back_to_raw() {
        assert_eq!(format_event_date(None, None, Some("Next week")), "Next week");
        assert_eq!(format_event_date(None, None, None), "Date TBA");
    }

    #[test]
    fn test_parse_time_without_seconds() {
        assert_eq!(parse_time(Some("08:05")), NaiveTime::from_hms_opt(8, 5, 0));
        assert_eq!(parse_time(Some("late")), None);
    }

    #[test]
    fn test_parse_local_datetime() {
        let (date, time) = parse_local_datetime(Some("2026-10-17T19:30:00"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 10, 17));
        assert_eq!(time, NaiveTime::from_hms_opt(19, 30, 0));

        let (date, time) = parse_local_datetime(Some("2026-10-17"));
        assert_eq!(date, NaiveDate::from_ymd_opt(2026, 10, 17));
        assert_eq!(time, None);
    }
}
