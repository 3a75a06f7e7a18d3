use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::types::{StoreError, StoreResult};

/// Resolve a time-series time expression against `now`.
///
/// Accepted forms: `now`, `now-<n><unit>` / `now+<n><unit>` with unit one of
/// `s m h d w`, epoch milliseconds, and RFC 3339.
pub fn parse_time(expr: &str, now: DateTime<Utc>) -> StoreResult<DateTime<Utc>> {
    let expr = expr.trim();
    let invalid = || StoreError::InvalidTime(expr.to_string());

    if expr == "now" {
        return Ok(now);
    }

    if let Some(rest) = expr.strip_prefix("now") {
        let (sign, offset) = match rest.chars().next() {
            Some('-') => (-1, &rest[1..]),
            Some('+') => (1, &rest[1..]),
            _ => return Err(invalid()),
        };
        let delta = parse_offset(offset).ok_or_else(invalid)?;
        let shifted = if sign < 0 {
            now.checked_sub_signed(delta)
        } else {
            now.checked_add_signed(delta)
        };
        return shifted.ok_or_else(invalid);
    }

    if !expr.is_empty() && expr.bytes().all(|b| b.is_ascii_digit()) {
        let ms: i64 = expr.parse().map_err(|_| invalid())?;
        return Utc.timestamp_millis_opt(ms).single().ok_or_else(invalid);
    }

    DateTime::parse_from_rfc3339(expr)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| invalid())
}

/// `None` for unknown units and for amounts outside the representable range.
fn parse_offset(raw: &str) -> Option<Duration> {
    let unit = raw.chars().last()?;
    let amount: i64 = raw[..raw.len() - unit.len_utf8()].parse().ok()?;
    match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        'w' => Duration::try_weeks(amount),
        _ => None,
    }
}
