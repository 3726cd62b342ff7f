//! Tolerant extraction of scalar fields from loosely-shaped JSON.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::Coordinates;

/// Reads a number, accepting numeric strings.
#[must_use]
pub fn as_f64(value: &Value) -> Option<f64> {
    let number: Option<f64> = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number.filter(|f| f.is_finite())
}

/// Reads a non-empty string, trimming surrounding whitespace.
#[must_use]
pub fn as_text(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Reads an identifier that may be sent as a string or a number.
#[must_use]
pub fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        other => as_text(other),
    }
}

/// Reads a `{lat, lng}` object.
#[must_use]
pub fn as_coordinates(value: &Value) -> Option<Coordinates> {
    let lat = as_f64(value.get("lat")?)?;
    let lng = as_f64(value.get("lng")?)?;
    Some(Coordinates::new(lat, lng))
}

/// Reads a timestamp in RFC 3339 form, or the naive ISO forms produced by
/// Python's `isoformat()` and `SQLite`'s `CURRENT_TIMESTAMP` (assumed UTC).
#[must_use]
pub fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

/// Reads a boolean, accepting `0`/`1` as sent by `SQLite`-backed APIs.
#[must_use]
pub fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        _ => None,
    }
}

/// Result of parsing a JSON array entity by entity.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedList<T> {
    /// Entities that parsed successfully, in input order.
    pub items: Vec<T>,
    /// How many elements were rejected.
    pub dropped: usize,
}

/// The payload was expected to be a JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected a JSON array")]
pub struct NotAnArray;

/// Parses every element of a JSON array independently, dropping the ones
/// that fail instead of failing the whole list.
///
/// # Errors
///
/// Returns [`NotAnArray`] if `value` is not an array.
pub fn parse_list<T: DeserializeOwned>(value: Value) -> Result<ParsedList<T>, NotAnArray> {
    let Value::Array(elements) = value else {
        return Err(NotAnArray);
    };

    let total = elements.len();
    let items: Vec<T> = elements
        .into_iter()
        .filter_map(|element| serde_json::from_value(element).ok())
        .collect();
    let dropped = total - items.len();

    Ok(ParsedList { items, dropped })
}
