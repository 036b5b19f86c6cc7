//! Display helpers shared by page contexts.

use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Date, Duration, OffsetDateTime, PrimitiveDateTime,
};

const DATETIME_FORMATS: &[&[FormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
];

const FALLBACK: &str = "-";

/// A parsed timestamp. Values with an offset only compare with each other.
enum Stamp {
    Naive(PrimitiveDateTime),
    Aware(OffsetDateTime),
}

fn parse_timestamp(raw: &str) -> Option<Stamp> {
    let normalized = raw.trim().replace(' ', "T");
    if let Ok(aware) = OffsetDateTime::parse(&normalized, &Rfc3339) {
        return Some(Stamp::Aware(aware));
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| PrimitiveDateTime::parse(&normalized, fmt).ok())
        .or_else(|| {
            Date::parse(&normalized, format_description!("[year]-[month]-[day]"))
                .ok()
                .map(|d| d.midnight())
        })
        .map(Stamp::Naive)
}

fn elapsed(start: Stamp, end: Stamp) -> Option<Duration> {
    match (start, end) {
        (Stamp::Naive(start), Stamp::Naive(end)) => Some(end - start),
        (Stamp::Aware(start), Stamp::Aware(end)) => Some(end - start),
        _ => None,
    }
}

/// Human readable span between two timestamps, e.g. `"1 day, 1 hr, 30 min"`.
/// Spans under an hour are minutes only. Unparsable input yields `"-"`.
pub fn format_duration(start: &str, end: &str) -> String {
    let Some(span) = parse_timestamp(start)
        .zip(parse_timestamp(end))
        .and_then(|(start, end)| elapsed(start, end))
    else {
        return FALLBACK.to_string();
    };

    let total_minutes = (span.as_seconds_f64() / 60.0).floor() as i64;
    if total_minutes < 60 {
        return format!("{total_minutes} min");
    }

    let days = total_minutes / (60 * 24);
    let rem = total_minutes % (60 * 24);
    let hours = rem / 60;
    let minutes = rem % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{} day{}", days, if days != 1 { "s" } else { "" }));
    }
    if hours > 0 {
        parts.push(format!("{} hr{}", hours, if hours != 1 { "s" } else { "" }));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} min"));
    }
    if parts.is_empty() {
        "0 min".to_string()
    } else {
        parts.join(", ")
    }
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Today's date as `YYYY-MM-DD`.
pub fn today() -> String {
    local_now()
        .format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// The current time as `YYYY-MM-DD HH:MM:SS`.
pub fn now_timestamp() -> String {
    local_now()
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn under_an_hour_is_minutes_only() {
        assert_eq!(format_duration("2024-03-01 00:00", "2024-03-01 00:59"), "59 min");
        assert_eq!(format_duration("2024-03-01 10:00:00", "2024-03-01 10:00:00"), "0 min");
    }

    #[test]
    fn days_hours_and_minutes() {
        assert_eq!(
            format_duration("2024-03-01T00:00", "2024-03-02T01:30"),
            "1 day, 1 hr, 30 min"
        );
        assert_eq!(format_duration("2024-03-01 00:00:00", "2024-03-01 02:00:00"), "2 hrs");
        assert_eq!(format_duration("2024-03-01 00:00:00", "2024-03-01 01:00:00"), "1 hr");
        assert_eq!(format_duration("2024-03-01", "2024-03-03"), "2 days");
    }

    #[test]
    fn fractional_seconds_floor_to_minutes() {
        assert_eq!(
            format_duration("2024-03-01 00:00:00.000", "2024-03-01 00:01:59.900"),
            "1 min"
        );
    }

    #[test]
    fn negative_spans_stay_in_minutes() {
        assert_eq!(format_duration("2024-03-01 01:00", "2024-03-01 00:00"), "-60 min");
    }

    #[test]
    fn unparsable_input_falls_back() {
        assert_eq!(format_duration("soon", "2024-03-01 00:00"), "-");
        assert_eq!(format_duration("2024-03-01 00:00", ""), "-");
        assert_eq!(format_duration("2024-13-45 99:99", "2024-03-01 00:00"), "-");
    }

    #[test]
    fn offset_timestamps_are_compared_in_utc() {
        assert_eq!(format_duration("2024-03-01T00:00:00Z", "2024-03-01T00:30:00Z"), "30 min");
        assert_eq!(
            format_duration("2024-03-01T00:00:00+00:00", "2024-03-01T03:15:00+02:00"),
            "1 hr, 15 min"
        );
        assert_eq!(format_duration("2024-03-01 00:00:00Z", "2024-03-02 00:00:00Z"), "1 day");
    }

    #[test]
    fn mixed_offset_and_naive_fall_back() {
        assert_eq!(format_duration("2024-03-01T00:00:00Z", "2024-03-01 00:30:00"), "-");
    }

    #[test]
    fn today_is_iso_date() {
        let t = today();
        assert_eq!(t.len(), 10);
        assert!(Date::parse(&t, format_description!("[year]-[month]-[day]")).is_ok());
        assert_eq!(now_timestamp().len(), 19);
    }
}
