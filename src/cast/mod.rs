//! Attribute casting.
//!
//! Two fixed lookup tables map a cast's base name onto a conversion: one
//! used when reading an attribute (storage → native), one when writing it
//! (native → storage). A cast missing from a table is the identity.

mod convert;

pub use convert::{decode_json, encode_json, parse_datetime, to_bool, to_float, to_int, to_text};
pub(crate) use convert::numeric_prefix;

use crate::core::{CastType, ModelError, Result, Value};
use lazy_static::lazy_static;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;

pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Largest fraction digit count a `decimal:N` cast accepts.
pub const MAX_DECIMAL_DIGITS: usize = 30;

/// Read-direction conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastAs {
    String,
    Int,
    Float,
    Decimal,
    Bool,
    Object,
    FromJson,
    Collection,
    Date,
    DateTime,
    Timestamp,
}

/// Write-direction conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastTo {
    Boolean,
    DateTime,
    Timestamp,
    Json,
}

lazy_static! {
    static ref CAST_AS_DEFINITIONS: HashMap<&'static str, CastAs> = HashMap::from([
        ("uuid", CastAs::String),
        ("int", CastAs::Int),
        ("integer", CastAs::Int),
        ("real", CastAs::Float),
        ("float", CastAs::Float),
        ("double", CastAs::Float),
        ("decimal", CastAs::Decimal),
        ("string", CastAs::String),
        ("bool", CastAs::Bool),
        ("boolean", CastAs::Bool),
        ("object", CastAs::Object),
        ("array", CastAs::FromJson),
        ("json", CastAs::FromJson),
        ("collection", CastAs::Collection),
        ("date", CastAs::Date),
        ("datetime", CastAs::DateTime),
        ("timestamp", CastAs::Timestamp),
    ]);

    static ref CAST_TO_DEFINITIONS: HashMap<&'static str, CastTo> = HashMap::from([
        ("bool", CastTo::Boolean),
        ("boolean", CastTo::Boolean),
        ("date", CastTo::DateTime),
        ("datetime", CastTo::DateTime),
        ("timestamp", CastTo::Timestamp),
        ("object", CastTo::Json),
        ("array", CastTo::Json),
        ("json", CastTo::Json),
        ("collection", CastTo::Json),
    ]);
}

/// Per-model settings a conversion may need.
#[derive(Debug, Clone, Copy)]
pub struct CastContext<'a> {
    pub date_format: &'a str,
}

impl Default for CastContext<'_> {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT,
        }
    }
}

pub fn cast_as_definition(cast: &CastType) -> Option<CastAs> {
    CAST_AS_DEFINITIONS.get(cast.base()).copied()
}

pub fn cast_to_definition(cast: &CastType) -> Option<CastTo> {
    CAST_TO_DEFINITIONS.get(cast.base()).copied()
}

/// Fraction digits of a `decimal:N` cast, at most [`MAX_DECIMAL_DIGITS`].
pub fn decimal_digits(cast: &CastType) -> Result<usize> {
    let digits = cast
        .parameter()
        .and_then(|p| p.trim().parse::<usize>().ok())
        .ok_or_else(|| {
            ModelError::Cast(format!("Cast '{}' needs a digit count, e.g. decimal:2", cast))
        })?;

    if digits > MAX_DECIMAL_DIGITS {
        return Err(ModelError::Cast(format!(
            "Cast '{}' asks for more than {} fraction digits",
            cast, MAX_DECIMAL_DIGITS
        )));
    }
    Ok(digits)
}

impl CastAs {
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "as_string",
            Self::Int => "as_int",
            Self::Float => "as_float",
            Self::Decimal => "as_decimal",
            Self::Bool => "as_bool",
            Self::Object => "as_object",
            Self::FromJson => "from_json",
            Self::Collection => "as_collection",
            Self::Date => "as_date",
            Self::DateTime => "as_datetime",
            Self::Timestamp => "as_timestamp",
        }
    }

    pub fn apply(&self, value: &Value, cast: &CastType, ctx: &CastContext<'_>) -> Result<Value> {
        match self {
            Self::String => Ok(Value::Text(to_text(value))),
            Self::Int => to_int(value).map(Value::Integer),
            Self::Float => to_float(value).map(Value::Float),
            Self::Decimal => {
                let digits = decimal_digits(cast)?;
                let number = to_float(value)?;
                Ok(Value::Text(format!("{:.*}", digits, number)))
            }
            Self::Bool => Ok(Value::Boolean(to_bool(value))),
            Self::Object | Self::FromJson => decode_json(value).map(Value::Json),
            Self::Collection => {
                let collection = match decode_json(value)? {
                    JsonValue::Null => JsonValue::Array(Vec::new()),
                    json @ (JsonValue::Array(_) | JsonValue::Object(_)) => json,
                    scalar => JsonValue::Array(vec![scalar]),
                };
                Ok(Value::Json(collection))
            }
            Self::Date => parse_datetime(value, cast.parameter(), ctx.date_format)
                .map(|ts| Value::Date(ts.date_naive())),
            Self::DateTime => {
                parse_datetime(value, cast.parameter(), ctx.date_format).map(Value::Timestamp)
            }
            Self::Timestamp => parse_datetime(value, cast.parameter(), ctx.date_format)
                .map(|ts| Value::Integer(ts.timestamp())),
        }
    }
}

impl fmt::Display for CastAs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl CastTo {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "cast_as_boolean",
            Self::DateTime => "cast_as_datetime",
            Self::Timestamp => "cast_as_timestamp",
            Self::Json => "cast_attribute_as_json",
        }
    }

    /// Dates are parsed with the cast's own format first and always stored
    /// in the model's date format.
    pub fn apply(&self, value: &Value, cast: &CastType, ctx: &CastContext<'_>) -> Result<Value> {
        match self {
            Self::Boolean => Ok(Value::Boolean(to_bool(value))),
            Self::DateTime => parse_datetime(value, cast.parameter(), ctx.date_format)
                .map(|ts| Value::Text(ts.format(ctx.date_format).to_string())),
            Self::Timestamp => parse_datetime(value, cast.parameter(), ctx.date_format)
                .map(|ts| Value::Integer(ts.timestamp())),
            Self::Json => Ok(Value::Text(encode_json(value))),
        }
    }
}

impl fmt::Display for CastTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Cast a stored value into its native form.
pub fn cast_from_storage(cast: &CastType, value: Value, ctx: &CastContext<'_>) -> Result<Value> {
    let Some(method) = cast_as_definition(cast) else {
        return Ok(value);
    };

    if value.is_null() {
        return Ok(value);
    }

    method.apply(&value, cast, ctx)
}

/// Cast a native value into its storage form.
pub fn cast_for_storage(cast: &CastType, value: Value, ctx: &CastContext<'_>) -> Result<Value> {
    let Some(method) = cast_to_definition(cast) else {
        return Ok(value);
    };

    if value.is_null() {
        return Ok(value);
    }

    method.apply(&value, cast, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn read(cast: &str, value: Value) -> Value {
        cast_from_storage(&CastType::parse(cast), value, &CastContext::default()).unwrap()
    }

    fn write(cast: &str, value: Value) -> Value {
        cast_for_storage(&CastType::parse(cast), value, &CastContext::default()).unwrap()
    }

    #[test]
    fn test_read_scalars() {
        assert_eq!(read("integer", Value::Text("42".into())), Value::Integer(42));
        assert_eq!(read("float", Value::Text("1.5".into())), Value::Float(1.5));
        assert_eq!(read("boolean", Value::Integer(1)), Value::Boolean(true));
        assert_eq!(read("uuid", Value::Integer(7)), Value::Text("7".into()));
        assert_eq!(read("decimal:2", Value::Float(3.14159)), Value::Text("3.14".into()));
    }

    #[test]
    fn test_read_json_and_dates() {
        assert_eq!(read("array", Value::Text("[1,2]".into())), Value::Json(json!([1, 2])));
        assert_eq!(read("collection", Value::Text("".into())), Value::Json(json!([])));
        assert_eq!(
            read("date", Value::Text("2023-05-06 12:00:00".into())),
            Value::Date(NaiveDate::from_ymd_opt(2023, 5, 6).unwrap())
        );
        assert_eq!(
            read("timestamp", Value::Text("1970-01-01 00:01:00".into())),
            Value::Integer(60)
        );
    }

    #[test]
    fn test_null_and_unknown_are_identity() {
        assert_eq!(read("integer", Value::Null), Value::Null);
        assert_eq!(read("money", Value::Text("x".into())), Value::Text("x".into()));
        assert_eq!(write("string", Value::Integer(3)), Value::Integer(3));
    }

    #[test]
    fn test_write_direction() {
        assert_eq!(write("boolean", Value::Text("0".into())), Value::Boolean(false));
        assert_eq!(write("json", Value::Json(json!({"a": 1}))), Value::Text("{\"a\":1}".into()));
        assert_eq!(
            write("datetime", Value::Text("2024-01-02T03:04:05Z".into())),
            Value::Text("2024-01-02 03:04:05".into())
        );
    }

    #[test]
    fn test_decimal_requires_parameter() {
        let ctx = CastContext::default();
        let result = cast_from_storage(&CastType::parse("decimal"), Value::Float(1.0), &ctx);
        assert!(matches!(result, Err(ModelError::Cast(_))));
    }

    #[test]
    fn test_decimal_digit_count_is_capped() {
        let ctx = CastContext::default();
        let padded = format!("1.5{}", "0".repeat(29));
        assert_eq!(read("decimal:30", Value::Float(1.5)), Value::Text(padded));

        let result = cast_from_storage(&CastType::parse("decimal:70000"), Value::Float(1.5), &ctx);
        assert!(matches!(result, Err(ModelError::Cast(_))));
    }

    #[test]
    fn test_write_uses_cast_format() {
        assert_eq!(
            write("datetime:%d/%m/%Y", Value::Text("01/03/2024".into())),
            Value::Text("2024-03-01 00:00:00".into())
        );
        assert_eq!(
            write("timestamp:%d/%m/%Y", Value::Text("01/01/1970".into())),
            Value::Integer(0)
        );
    }
}
