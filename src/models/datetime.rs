//! Combined date-time strings as sent by the backend, and the split
//! date / time parts edited locally.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a combined date-time (or bare date, taken as midnight) into a comparable instant.
///
/// Offsets are normalized to UTC so values from different zones order correctly.
pub fn parse_instant(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Split into `("YYYY-MM-DD", "HH:MM")` for editing
pub fn split_date_time(raw: &str) -> Option<(String, String)> {
    let raw = raw.trim();
    // Keep the wall-clock time as sent; do not shift offsets for display
    let local = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| parse_instant(raw))?;
    Some((
        local.date().format("%Y-%m-%d").to_string(),
        local.time().format("%H:%M").to_string(),
    ))
}

/// Recombine edited parts into the wire format `YYYY-MM-DDTHH:MM:SS`
pub fn join_date_time(date: &str, time: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M"))
        .ok()?;
    Some(date.and_time(time).format("%Y-%m-%dT%H:%M:%S").to_string())
}
