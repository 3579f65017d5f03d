//! Scalar conversions used by the cast tables.
//!
//! String parsing is lenient the way storage drivers hand values back:
//! `"12abc"` reads as `12`, `" 3.5 "` as `3.5`.

use crate::core::{ModelError, Result, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value as JsonValue;

/// Formats tried, in order, when a date string has no explicit format.
const FALLBACK_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Longest leading slice that reads as a number, or `""`.
pub(crate) fn numeric_prefix(text: &str, allow_fraction: bool) -> &str {
    let trimmed = text.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (idx, ch) in trimmed.char_indices() {
        match ch {
            '+' | '-' if idx == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if allow_fraction && !seen_dot => seen_dot = true,
            _ => break,
        }
        end = idx + ch.len_utf8();
    }

    if seen_digit { &trimmed[..end] } else { "" }
}

pub fn to_int(value: &Value) -> Result<i64> {
    match value {
        Value::Null => Ok(0),
        Value::Integer(i) => Ok(*i),
        Value::Float(f) => value
            .as_i64()
            .ok_or_else(|| ModelError::Cast(format!("Float {} is out of integer range", f))),
        Value::Boolean(b) => Ok(i64::from(*b)),
        Value::Text(s) => {
            let prefix = numeric_prefix(s, true);
            if prefix.is_empty() {
                return Ok(0);
            }
            match prefix.parse::<i64>() {
                Ok(i) => Ok(i),
                Err(_) => prefix
                    .parse::<f64>()
                    .map(|f| f.trunc() as i64)
                    .map_err(|e| {
                        ModelError::Cast(format!("Cannot read '{}' as integer: {}", s, e))
                    }),
            }
        }
        Value::Json(JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| ModelError::Cast(format!("Cannot read {} as integer", n))),
        Value::Json(json) => Ok(i64::from(Value::Json(json.clone()).as_bool())),
        Value::Timestamp(ts) => Ok(ts.timestamp()),
        Value::Date(_) => Err(ModelError::Cast("Cannot read DATE as integer".into())),
    }
}

pub fn to_float(value: &Value) -> Result<f64> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Text(s) => {
            let prefix = numeric_prefix(s, true);
            if prefix.is_empty() {
                return Ok(0.0);
            }
            prefix
                .parse::<f64>()
                .map_err(|e| ModelError::Cast(format!("Cannot read '{}' as float: {}", s, e)))
        }
        Value::Json(JsonValue::Number(n)) => n
            .as_f64()
            .ok_or_else(|| ModelError::Cast(format!("Cannot read {} as float", n))),
        other => to_int(other).map(|i| i as f64),
    }
}

pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Text(s) => {
            let normalized = s.trim().to_ascii_lowercase();
            match normalized.as_str() {
                "true" | "yes" | "on" => true,
                "" | "false" | "no" | "off" => false,
                other => {
                    let prefix = numeric_prefix(other, true);
                    prefix.parse::<f64>().map(|f| f != 0.0).unwrap_or(false)
                }
            }
        }
        other => other.as_bool(),
    }
}

pub fn to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Decode a stored JSON document. Empty text decodes to JSON null.
pub fn decode_json(value: &Value) -> Result<JsonValue> {
    match value {
        Value::Json(json) => Ok(json.clone()),
        Value::Text(s) if s.trim().is_empty() => Ok(JsonValue::Null),
        Value::Text(s) => serde_json::from_str(s)
            .map_err(|e| ModelError::Cast(format!("Invalid JSON document: {}", e))),
        other => Ok(other.to_json()),
    }
}

/// Encode a value as JSON text for storage.
///
/// Text that already holds a JSON array or object is kept as is.
pub fn encode_json(value: &Value) -> String {
    match value {
        Value::Text(s) => match serde_json::from_str::<JsonValue>(s) {
            Ok(JsonValue::Array(_)) | Ok(JsonValue::Object(_)) => s.clone(),
            _ => JsonValue::String(s.clone()).to_string(),
        },
        other => other.to_json().to_string(),
    }
}

pub fn parse_datetime(
    value: &Value,
    format: Option<&str>,
    date_format: &str,
) -> Result<DateTime<Utc>> {
    match value {
        Value::Timestamp(ts) => Ok(*ts),
        Value::Date(d) => Ok(midnight(*d)),
        Value::Integer(secs) => from_unix(*secs),
        Value::Float(f) => from_unix(f.trunc() as i64),
        Value::Text(s) => parse_datetime_str(s.trim(), format, date_format),
        other => Err(ModelError::Cast(format!(
            "Cannot read {} as a date",
            other.type_name()
        ))),
    }
}

fn parse_datetime_str(
    text: &str,
    format: Option<&str>,
    date_format: &str,
) -> Result<DateTime<Utc>> {
    if let Some(format) = format {
        if let Some(ts) = parse_with_format(text, format) {
            return Ok(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Some(ts) = parse_with_format(text, date_format) {
        return Ok(ts);
    }

    for fallback in FALLBACK_DATETIME_FORMATS {
        if let Some(ts) = parse_with_format(text, fallback) {
            return Ok(ts);
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(midnight(d));
    }

    if let Ok(secs) = text.parse::<i64>() {
        return from_unix(secs);
    }

    Err(ModelError::Cast(format!("Cannot parse '{}' as a date", text)))
}

fn parse_with_format(text: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(text, format).ok().map(midnight)
}

fn midnight(d: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&d.and_time(chrono::NaiveTime::MIN))
}

fn from_unix(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| ModelError::Cast(format!("Timestamp {} is out of range", secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_lenient_integer() {
        assert_eq!(to_int(&Value::Text("12abc".into())).unwrap(), 12);
        assert_eq!(to_int(&Value::Text("  -7".into())).unwrap(), -7);
        assert_eq!(to_int(&Value::Text("4.9".into())).unwrap(), 4);
        assert_eq!(to_int(&Value::Text("abc".into())).unwrap(), 0);
        assert_eq!(to_int(&Value::Boolean(true)).unwrap(), 1);
    }

    #[test]
    fn test_bool_strings() {
        assert!(to_bool(&Value::Text("1".into())));
        assert!(to_bool(&Value::Text("true".into())));
        assert!(!to_bool(&Value::Text("0".into())));
        assert!(!to_bool(&Value::Text("off".into())));
        assert!(!to_bool(&Value::Text("abc".into())));
    }

    #[test]
    fn test_parse_datetime_variants() {
        let fmt = "%Y-%m-%d %H:%M:%S";
        let ts = parse_datetime(&Value::Text("2024-03-01 10:20:30".into()), None, fmt).unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 1));
        assert_eq!(ts.hour(), 10);

        let custom =
            parse_datetime(&Value::Text("01/03/2024".into()), Some("%d/%m/%Y"), fmt).unwrap();
        assert_eq!(custom.month(), 3);

        let unix = parse_datetime(&Value::Integer(0), None, fmt).unwrap();
        assert_eq!(unix.year(), 1970);

        assert!(parse_datetime(&Value::Text("not a date".into()), None, fmt).is_err());
    }

    #[test]
    fn test_encode_json_keeps_documents() {
        assert_eq!(encode_json(&Value::Text("[1,2]".into())), "[1,2]");
        assert_eq!(encode_json(&Value::Text("plain".into())), "\"plain\"");
        assert_eq!(encode_json(&Value::Integer(3)), "3");
    }
}
