//! Message timestamps, shown as local `HH:MM` (24-hour).

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

const DISPLAY_FORMAT: &str = "%H:%M";

/// The current local time as `HH:MM`.
pub fn format_timestamp() -> String {
    Local::now().format(DISPLAY_FORMAT).to_string()
}

/// Convert a backend timestamp to local `HH:MM`.
///
/// Accepts RFC 3339 (`2025-03-01T09:15:00Z`, `...+02:00`) and naive ISO
/// timestamps (`2025-03-01T09:15:00.123456`), the latter read as local
/// time.  Anything else falls back to the current time.
pub fn format_api_timestamp(raw: &str) -> String {
    match parse_api_timestamp(raw) {
        Some(dt) => dt.format(DISPLAY_FORMAT).to_string(),
        None => {
            tracing::debug!(raw = %raw, "unparseable history timestamp, using current time");
            format_timestamp()
        }
    }
}

fn parse_api_timestamp(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()?;
    Local.from_local_datetime(&naive).earliest()
}
