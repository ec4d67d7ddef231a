//! Normalization of the loosely-typed usage payload.
//!
//! The backend is inconsistent about encodings: utilization shows up as an
//! integer, a float or a string such as `"42%"`, and reset timestamps come
//! with or without fractional seconds. Everything here is pure and never
//! fails on a single bad field; a broken window degrades to 0% / no reset.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use super::error::UsageError;
use super::types::{UsageRecord, WindowPayload};

/// Key of the rolling session window.
const SESSION_WINDOW_KEY: &str = "five_hour";
/// Key of the weekly window.
const WEEKLY_WINDOW_KEY: &str = "seven_day";

/// Offset-less timestamps (`2024-01-01T10:00:00` / `...00.123`) are read as UTC.
const NAIVE_RESET_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse the body of `/organizations/{id}/usage`.
///
/// Fails with `ParseError` only when the body is not a JSON object. Missing or
/// malformed windows yield `0.0` and `None`.
pub fn parse_usage_response(body: &str) -> Result<UsageRecord, UsageError> {
    let json: Map<String, Value> = serde_json::from_str(body).map_err(|e| {
        log::debug!("Usage: body is not a JSON object: {}", e);
        UsageError::ParseError
    })?;

    let (session_percent, session_reset_at) = parse_window(json.get(SESSION_WINDOW_KEY));
    let (weekly_percent, weekly_reset_at) = parse_window(json.get(WEEKLY_WINDOW_KEY));

    Ok(UsageRecord {
        session_percent,
        session_reset_at,
        weekly_percent,
        weekly_reset_at,
    })
}

/// Extract `(percent, reset)` from one window object.
fn parse_window(raw: Option<&Value>) -> (f64, Option<DateTime<Utc>>) {
    let window = match raw {
        Some(value) if value.is_object() => {
            serde_json::from_value::<WindowPayload>(value.clone()).unwrap_or_default()
        }
        Some(Value::Null) | None => return (0.0, None),
        Some(other) => {
            log::debug!("Usage: ignoring non-object window: {}", other);
            return (0.0, None);
        }
    };

    let percent = parse_utilization(window.utilization.as_ref());
    let reset = window
        .resets_at
        .as_ref()
        .and_then(Value::as_str)
        .and_then(parse_reset_time);

    (percent, reset)
}

/// Interpret a utilization value as a percent.
///
/// Accepts integers, floats and numeric strings with optional surrounding
/// whitespace and a trailing `%`. Anything else, including non-finite
/// numbers, becomes `0.0`.
pub fn parse_utilization(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
            trimmed.parse::<f64>().ok()
        }
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Parse a reset timestamp. RFC 3339 (with or without fractional seconds) is
/// tried first, then an offset-less form assumed to be UTC.
pub fn parse_reset_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, NAIVE_RESET_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
