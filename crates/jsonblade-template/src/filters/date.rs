//! Date filters.
//!
//! Dates are read from epoch milliseconds, from `DD/MM/YYYY` (UTC midnight)
//! and from the common ISO 8601 / RFC 3339 / RFC 2822 spellings. Naive
//! date-times are taken as UTC and every output is in UTC. A value that does
//! not read as a date formats as `"Invalid Date"`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::{truthy_arg, BuiltinFilter};
use crate::value::{to_display_string, to_number};

/// The date group.
pub const FILTERS: &[(&str, BuiltinFilter)] = &[
    ("formatDate", format_date),
    ("fromNow", from_now),
    ("addDays", add_days),
    ("isoDate", iso_date),
    ("timestamp", timestamp),
];

const INVALID_DATE: &str = "Invalid Date";
const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

static DAY_MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid date pattern"));

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Reads a value as a UTC date-time.
///
/// Numbers are epoch milliseconds; `null` and booleans count as 0 and 1
/// milliseconds.
#[allow(clippy::cast_possible_truncation)]
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => {
            let millis = to_number(value);
            if !millis.is_finite() {
                return None;
            }
            Utc.timestamp_millis_opt(millis.trunc() as i64).single()
        }
        Value::String(s) => parse_date_str(s),
        Value::Array(_) => parse_date_str(&to_display_string(value)),
        Value::Object(_) => None,
    }
}

fn parse_date_str(text: &str) -> Option<DateTime<Utc>> {
    if let Some(caps) = DAY_MONTH_YEAR.captures(text) {
        let day: i64 = caps[1].parse().ok()?;
        let month: i64 = caps[2].parse().ok()?;
        let year: i64 = caps[3].parse().ok()?;
        return utc_from_parts(year, month, day);
    }

    let s = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Builds UTC midnight for a calendar date, letting an out-of-range month or
/// day roll over into the next month or year (`31/02/2024` is March 2nd).
fn utc_from_parts(year: i64, month: i64, day: i64) -> Option<DateTime<Utc>> {
    let months = year * 12 + (month - 1);
    let year = i32::try_from(months.div_euclid(12)).ok()?;
    let month = u32::try_from(months.rem_euclid(12) + 1).ok()?;
    let first = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;
    let date = first.checked_add_signed(Duration::try_days(day - 1)?)?;
    Some(Utc.from_utc_datetime(&date))
}

fn iso_string(date: &DateTime<Utc>) -> String {
    date.format(ISO_FORMAT).to_string()
}

/// Formats a date with `YYYY`, `MM`, `DD`, `HH`, `mm` and `ss` tokens.
/// The default pattern is `YYYY-MM-DD`.
pub fn format_date(value: &Value, args: &[Value]) -> Value {
    let pattern = truthy_arg(args, 0).map_or_else(|| "YYYY-MM-DD".to_string(), to_display_string);
    let Some(date) = parse_date(value) else {
        return Value::String(INVALID_DATE.to_string());
    };
    let formatted = pattern
        .replace("YYYY", &date.year().to_string())
        .replace("MM", &format!("{:02}", date.month()))
        .replace("DD", &format!("{:02}", date.day()))
        .replace("HH", &format!("{:02}", date.hour()))
        .replace("mm", &format!("{:02}", date.minute()))
        .replace("ss", &format!("{:02}", date.second()));
    Value::String(formatted)
}

/// Relative time in the past: `"3 days ago"`, `"1 year ago"`, `"just now"`.
/// Future dates also read as `"just now"`.
pub fn from_now(value: &Value, _args: &[Value]) -> Value {
    let Some(date) = parse_date(value) else {
        return Value::String(INVALID_DATE.to_string());
    };
    let elapsed = Utc::now().timestamp_millis() - date.timestamp_millis();
    Value::String(relative_phrase(elapsed))
}

fn relative_phrase(elapsed_millis: i64) -> String {
    let seconds = elapsed_millis.div_euclid(1000);
    let minutes = seconds.div_euclid(60);
    let hours = minutes.div_euclid(60);
    let days = hours.div_euclid(24);
    let months = days.div_euclid(30);
    let years = days.div_euclid(365);

    let buckets = [(years, "year"), (months, "month"), (days, "day"), (hours, "hour"), (minutes, "minute")];
    buckets
        .iter()
        .find(|(count, _)| *count > 0)
        .map_or_else(
            || "just now".to_string(),
            |(count, unit)| {
                let plural = if *count > 1 { "s" } else { "" };
                format!("{count} {unit}{plural} ago")
            },
        )
}

/// Shifts a date by a whole number of days and returns it as an ISO string.
#[allow(clippy::cast_possible_truncation)]
pub fn add_days(value: &Value, args: &[Value]) -> Value {
    let Some(date) = parse_date(value) else {
        return Value::String(INVALID_DATE.to_string());
    };
    let days = truthy_arg(args, 0).map_or(0.0, to_number);
    let days = if days.is_finite() { days.trunc() as i64 } else { 0 };
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .map_or_else(
            || Value::String(INVALID_DATE.to_string()),
            |shifted| Value::String(iso_string(&shifted)),
        )
}

/// `2024-01-15T00:00:00.000Z`
pub fn iso_date(value: &Value, _args: &[Value]) -> Value {
    let text = parse_date(value).map_or_else(|| INVALID_DATE.to_string(), |date| iso_string(&date));
    Value::String(text)
}

/// Epoch milliseconds, or 0 for an invalid date.
pub fn timestamp(value: &Value, _args: &[Value]) -> Value {
    Value::from(parse_date(value).map_or(0, |date| date.timestamp_millis()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_format_date_default_pattern() {
        assert_eq!(format_date(&json!("2024-01-15"), &[]), json!("2024-01-15"));
    }

    #[test]
    fn test_format_date_tokens() {
        let result = format_date(&json!("2024-01-15T10:30:45Z"), &[json!("DD/MM/YYYY HH:mm:ss")]);
        assert_eq!(result, json!("15/01/2024 10:30:45"));
    }

    #[test]
    fn test_day_month_year_input_is_utc_midnight() {
        assert_eq!(format_date(&json!("15/03/2024"), &[json!("YYYY-MM-DD HH:mm")]), json!("2024-03-15 00:00"));
        assert_eq!(iso_date(&json!("5/1/2024"), &[]), json!("2024-01-05T00:00:00.000Z"));
    }

    #[test]
    fn test_day_overflow_rolls_over() {
        assert_eq!(format_date(&json!("31/02/2024"), &[]), json!("2024-03-02"));
    }

    #[test]
    fn test_invalid_dates() {
        for v in [json!("not a date"), json!(""), json!({"a": 1})] {
            assert_eq!(format_date(&v, &[]), json!("Invalid Date"));
            assert_eq!(from_now(&v, &[]), json!("Invalid Date"));
            assert_eq!(iso_date(&v, &[]), json!("Invalid Date"));
            assert_eq!(add_days(&v, &[json!(1)]), json!("Invalid Date"));
            assert_eq!(timestamp(&v, &[]), json!(0));
        }
    }

    #[test]
    fn test_epoch_millis_input() {
        assert_eq!(iso_date(&json!(0), &[]), json!("1970-01-01T00:00:00.000Z"));
        assert_eq!(timestamp(&json!(86_400_000), &[]), json!(86_400_000));
    }

    #[test]
    fn test_timestamp_of_iso_string() {
        assert_eq!(timestamp(&json!("2024-01-01T00:00:00.000Z"), &[]), json!(1_704_067_200_000_i64));
    }

    #[test]
    fn test_add_days() {
        assert_eq!(add_days(&json!("2024-01-30"), &[json!(3)]), json!("2024-02-02T00:00:00.000Z"));
        assert_eq!(add_days(&json!("2024-01-30"), &[json!("-30")]), json!("2023-12-31T00:00:00.000Z"));
        assert_eq!(add_days(&json!("2024-01-30"), &[]), json!("2024-01-30T00:00:00.000Z"));
        assert_eq!(add_days(&json!("2024-01-30"), &[json!(1.9)]), json!("2024-01-31T00:00:00.000Z"));
    }

    #[test]
    fn test_naive_datetime_is_utc() {
        assert_eq!(iso_date(&json!("2024-06-01 08:15:00"), &[]), json!("2024-06-01T08:15:00.000Z"));
        assert_eq!(iso_date(&json!("2024-06-01T08:15"), &[]), json!("2024-06-01T08:15:00.000Z"));
    }

    #[test]
    fn test_from_now_buckets() {
        let ago = |d: Duration| json!((Utc::now() - d).to_rfc3339());
        assert_eq!(from_now(&ago(Duration::days(3)), &[]), json!("3 days ago"));
        assert_eq!(from_now(&ago(Duration::days(1)), &[]), json!("1 day ago"));
        assert_eq!(from_now(&ago(Duration::days(45)), &[]), json!("1 month ago"));
        assert_eq!(from_now(&ago(Duration::days(800)), &[]), json!("2 years ago"));
        assert_eq!(from_now(&ago(Duration::hours(5)), &[]), json!("5 hours ago"));
        assert_eq!(from_now(&ago(Duration::minutes(2)), &[]), json!("2 minutes ago"));
        assert_eq!(from_now(&ago(Duration::seconds(10)), &[]), json!("just now"));
    }

    #[test]
    fn test_future_is_just_now() {
        let future = json!((Utc::now() + Duration::days(10)).to_rfc3339());
        assert_eq!(from_now(&future, &[]), json!("just now"));
    }

    #[test]
    fn test_relative_phrase() {
        assert_eq!(relative_phrase(0), "just now");
        assert_eq!(relative_phrase(-5_000), "just now");
        assert_eq!(relative_phrase(61_000), "1 minute ago");
        assert_eq!(relative_phrase(366 * 86_400_000), "1 year ago");
    }
}
