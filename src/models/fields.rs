//! Lenient field decoders shared by the trip and activity payloads.
//!
//! Every decoder yields `Option<Option<T>>`: the outer `None` means the key was
//! absent (via `#[serde(default)]`), `Some(None)` means it was sent as `null`
//! or blank, `Some(Some(v))` carries the parsed value.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{de::Error as _, Deserialize, Deserializer};
use serde_json::Value;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

pub fn coordinate<'de, D>(deserializer: D) -> Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Option::<Value>::deserialize(deserializer)? {
        None => None,
        Some(Value::Number(number)) => Some(
            number
                .as_f64()
                .ok_or_else(|| D::Error::custom(format!("invalid coordinate: {number}")))?,
        ),
        Some(Value::String(raw)) => Some(
            raw.trim()
                .parse::<f64>()
                .map_err(|_| D::Error::custom(format!("could not convert string to float: '{raw}'")))?,
        ),
        Some(other) => return Err(D::Error::custom(format!("invalid coordinate: {other}"))),
    };

    match parsed {
        Some(value) if !value.is_finite() => {
            Err(D::Error::custom(format!("invalid coordinate: {value}")))
        }
        other => Ok(Some(other)),
    }
}

pub fn flag<'de, D>(deserializer: D) -> Result<Option<Option<bool>>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Option::<Value>::deserialize(deserializer)? {
        None => None,
        Some(Value::Bool(value)) => Some(value),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => return Err(D::Error::custom(format!("invalid boolean: {number}"))),
        },
        Some(Value::String(raw)) => match raw.trim().to_ascii_lowercase().as_str() {
            "" => None,
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => return Err(D::Error::custom(format!("invalid boolean: '{raw}'"))),
        },
        Some(other) => return Err(D::Error::custom(format!("invalid boolean: {other}"))),
    };
    Ok(Some(parsed))
}

pub fn date<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(Some(None));
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Some(None));
    }
    parse_date(raw)
        .map(|value| Some(Some(value)))
        .ok_or_else(|| D::Error::custom(format!("invalid isoformat date: '{raw}'")))
}

pub fn datetime<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDateTime>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(Some(None));
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Some(None));
    }
    parse_datetime(raw)
        .map(|value| Some(Some(value)))
        .ok_or_else(|| D::Error::custom(format!("invalid isoformat string: '{raw}'")))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(raw).map(|value| value.date()))
}

/// Offsets are dropped; the wall-clock time is kept as sent.
fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Some(value.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
        })
}

pub fn normalize_optional(input: Option<String>) -> Option<String> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
