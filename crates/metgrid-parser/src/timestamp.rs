use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::errors::ParserError;
use crate::model::{ObservedRow, RecordPosition, SeriesBounds, Timestamp};

/// Parses the profiler's `YYYY/MM/DD HH:MM` field (seconds optional) truncated to whole seconds.
pub fn parse_profiler_timestamp(
    parser: &'static str,
    value: &str,
    position: RecordPosition,
) -> Result<Timestamp, ParserError> {
    static FORMATS: &[&str] = &["%Y/%m/%d %H:%M:%S", "%Y/%m/%d %H:%M"];
    let trimmed = value.trim();
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.with_nanosecond(0).unwrap_or(dt));
        }
    }
    Err(ParserError::MalformedTimestamp {
        parser,
        position,
        message: format!("invalid timestamp '{trimmed}'"),
    })
}

/// Converts a day-of-year into a calendar date for the given year. Day 366 only exists in leap
/// years.
pub fn date_from_day_of_year(year: i32, day_of_year: u32) -> Option<NaiveDate> {
    NaiveDate::from_yo_opt(year, day_of_year)
}

/// Splits an `HHMM` token into hour and minute, restoring leading zeros the logger drops
/// (`930` is 09:30, `5` is 00:05).
pub fn split_hour_minute(token: &str) -> Option<(u32, u32)> {
    let trimmed = token.trim();
    if trimmed.is_empty() || trimmed.len() > 4 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded = format!("{trimmed:0>4}");
    let hour = padded[..2].parse().ok()?;
    let minute = padded[2..].parse().ok()?;
    Some((hour, minute))
}

/// Splits a `SS.fff` token into whole seconds and milliseconds. Fraction digits past the third
/// are dropped.
pub fn split_seconds(token: &str) -> Option<(u32, u32)> {
    let trimmed = token.trim();
    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let seconds = whole.parse().ok()?;
    let millis_digits: String = fraction.chars().chain("000".chars()).take(3).collect();
    let millis = millis_digits.parse().ok()?;
    Some((seconds, millis))
}

/// Builds the tower timestamp from its year, day-of-year, hour+minute and seconds tokens.
pub fn parse_tower_timestamp(
    parser: &'static str,
    year: &str,
    day_of_year: &str,
    hour_minute: &str,
    seconds: &str,
    position: RecordPosition,
) -> Result<Timestamp, ParserError> {
    let malformed = |message: String| ParserError::MalformedTimestamp {
        parser,
        position,
        message,
    };

    let year_value: i32 = year
        .trim()
        .parse()
        .map_err(|err| malformed(format!("invalid year '{}': {err}", year.trim())))?;
    let doy_value: u32 = day_of_year
        .trim()
        .parse()
        .map_err(|err| malformed(format!("invalid day-of-year '{}': {err}", day_of_year.trim())))?;
    let date = date_from_day_of_year(year_value, doy_value).ok_or_else(|| {
        malformed(format!(
            "day-of-year {doy_value} does not exist in year {year_value}"
        ))
    })?;

    let (hour, minute) = split_hour_minute(hour_minute)
        .ok_or_else(|| malformed(format!("invalid hour/minute '{}'", hour_minute.trim())))?;
    let (second, millis) = split_seconds(seconds)
        .ok_or_else(|| malformed(format!("invalid seconds '{}'", seconds.trim())))?;

    let time = NaiveTime::from_hms_milli_opt(hour, minute, second, millis).ok_or_else(|| {
        malformed(format!(
            "time {hour:02}:{minute:02}:{second:02}.{millis:03} out of range"
        ))
    })?;

    Ok(date.and_time(time))
}

/// Start and end of the series are the timestamps of the first and last data row, in input
/// order.
pub fn series_bounds(rows: &[ObservedRow]) -> Option<SeriesBounds> {
    let start = rows.first()?.timestamp;
    let end = rows.last()?.timestamp;
    Some(SeriesBounds { start, end })
}
