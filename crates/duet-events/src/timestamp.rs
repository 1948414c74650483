//! Timestamp and duration parsing for the wire formats.
//!
//! Compact rows carry either an absolute ISO-8601 timestamp or an offset
//! relative to the previous event, written as a bare number of seconds or a
//! `1d2h3m4s` duration token. Valid offsets include:
//!
//! ```text
//! "42"       # 42 seconds
//! "42s"      # 42 seconds
//! "1h2m30s"  # 1 hour, 2 minutes, 30 seconds
//! "1d2s"     # 1 day, 2 seconds
//! ```

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

/// Error type for timestamp and duration parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseTimeError {
    #[error("invalid timestamp '{0}': expected an ISO-8601 date-time")]
    Timestamp(String),
    #[error("invalid duration '{0}': expected seconds or a token like '1d2h3m4s'")]
    Duration(String),
}

/// Parses an ISO-8601 timestamp. Offset-less values are taken as UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ParseTimeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| ParseTimeError::Timestamp(s.to_string()))
}

/// Parses a relative offset: bare digits are seconds, otherwise a
/// `<n>d<n>h<n>m<n>s` token with any subset of the units, in that order.
pub fn parse_duration(s: &str) -> Result<Duration, ParseTimeError> {
    let invalid = || ParseTimeError::Duration(s.to_string());

    if s.is_empty() {
        return Err(invalid());
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        let seconds: i64 = s.parse().map_err(|_| invalid())?;
        return Duration::try_seconds(seconds).ok_or_else(invalid);
    }

    let mut rest = s;
    let mut matched = false;
    let mut total: i64 = 0;
    for (unit, seconds_per) in [('d', 86_400), ('h', 3_600), ('m', 60), ('s', 1)] {
        if let Some((value, tail)) = take_unit(rest, unit) {
            let part = value.checked_mul(seconds_per).ok_or_else(invalid)?;
            total = total.checked_add(part).ok_or_else(invalid)?;
            rest = tail;
            matched = true;
        }
    }
    if !matched || !rest.is_empty() {
        return Err(invalid());
    }
    Duration::try_seconds(total).ok_or_else(invalid)
}

/// Consumes a leading `<digits><unit>` group, if the next group uses this
/// unit.
fn take_unit(input: &str, unit: char) -> Option<(i64, &str)> {
    let digits_end = input.find(|c: char| !c.is_ascii_digit())?;
    if digits_end == 0 {
        return None;
    }
    let (digits, tail) = input.split_at(digits_end);
    let mut chars = tail.chars();
    if chars.next() != Some(unit) {
        return None;
    }
    let value = digits.parse().ok()?;
    Some((value, chars.as_str()))
}
