use super::MessageBag;
use super::rules::{EMAIL_REGEX, Rule};
use crate::cast::{DEFAULT_DATE_FORMAT, parse_datetime, to_text};
use crate::core::{Result, Value};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::debug;

/// How size rules (`min`, `max`, `between`, `size`) measure a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SizeKind {
    Number,
    Items,
    Characters,
}

/// Runs parsed rules over a set of attribute values.
#[derive(Debug, Clone)]
pub struct Validator {
    data: BTreeMap<String, Value>,
    rules: Vec<(String, Vec<Rule>)>,
    errors: MessageBag,
}

impl Validator {
    /// Parse `rules` and validate `data` against them right away.
    pub fn make(data: BTreeMap<String, Value>, rules: &[(String, String)]) -> Result<Self> {
        let parsed = rules
            .iter()
            .map(|(field, rule)| Ok((field.clone(), Rule::parse_all(rule)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut validator = Self {
            data,
            rules: parsed,
            errors: MessageBag::new(),
        };
        validator.run();
        Ok(validator)
    }

    pub fn fails(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn passes(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &MessageBag {
        &self.errors
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    /// Data for fields that have rules and passed them.
    pub fn validated(&self) -> BTreeMap<String, Value> {
        self.rules
            .iter()
            .filter(|(field, _)| !self.errors.has(field))
            .filter_map(|(field, _)| self.data.get(field).map(|v| (field.clone(), v.clone())))
            .collect()
    }

    fn run(&mut self) {
        let mut errors = MessageBag::new();
        for (field, rules) in &self.rules {
            for message in check_field(field, self.data.get(field), rules) {
                errors.add(field, message);
            }
        }

        if !errors.is_empty() {
            debug!(fields = ?errors.keys(), "validation failed");
        }
        self.errors = errors;
    }
}

fn has_rule(rules: &[Rule], name: &str) -> bool {
    rules.iter().any(|rule| rule.name() == name)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Text(s) => s.trim().is_empty(),
        Value::Json(JsonValue::Array(items)) => items.is_empty(),
        Value::Json(JsonValue::Object(map)) => map.is_empty(),
        _ => false,
    }
}

fn check_field(field: &str, value: Option<&Value>, rules: &[Rule]) -> Vec<String> {
    let label = field.replace('_', " ");

    if value.is_none() && has_rule(rules, "sometimes") {
        return Vec::new();
    }

    let missing = match value {
        None => true,
        Some(Value::Text(s)) => s.trim().is_empty(),
        Some(_) => false,
    };

    if missing {
        return rules
            .iter()
            .filter(|rule| rule.is_implicit())
            .filter_map(|rule| check_rule(rule, &label, &Value::Null, SizeKind::Characters))
            .collect();
    }

    let value = value.unwrap_or(&Value::Null);
    if value.is_null() && has_rule(rules, "nullable") {
        return Vec::new();
    }

    let kind = if has_rule(rules, "numeric") || has_rule(rules, "integer") {
        SizeKind::Number
    } else if has_rule(rules, "array") || matches!(value, Value::Json(JsonValue::Array(_))) {
        SizeKind::Items
    } else {
        SizeKind::Characters
    };

    rules
        .iter()
        .filter(|rule| !rule.is_modifier())
        .filter_map(|rule| check_rule(rule, &label, value, kind))
        .collect()
}

fn measure(value: &Value, kind: SizeKind) -> Option<f64> {
    match kind {
        SizeKind::Number => match value {
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            other => other.as_f64(),
        },
        SizeKind::Items => match value {
            Value::Json(JsonValue::Array(items)) => Some(items.len() as f64),
            Value::Json(JsonValue::Object(map)) => Some(map.len() as f64),
            _ => None,
        },
        SizeKind::Characters => Some(to_text(value).chars().count() as f64),
    }
}

fn unit(kind: SizeKind) -> &'static str {
    match kind {
        SizeKind::Number => "",
        SizeKind::Items => " items",
        SizeKind::Characters => " characters",
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Float(f) => f.is_finite() && f.fract() == 0.0,
        Value::Text(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Integer(_) => true,
        Value::Float(f) => f.is_finite(),
        Value::Text(s) => s.trim().parse::<f64>().map(f64::is_finite).unwrap_or(false),
        _ => false,
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Boolean(_) => true,
        Value::Integer(i) => *i == 0 || *i == 1,
        Value::Text(s) => s == "0" || s == "1",
        _ => false,
    }
}

fn is_date(value: &Value) -> bool {
    match value {
        Value::Timestamp(_) | Value::Date(_) => true,
        Value::Text(s) => {
            !s.chars().all(|c| c.is_ascii_digit())
                && parse_datetime(value, None, DEFAULT_DATE_FORMAT).is_ok()
        }
        _ => false,
    }
}

fn is_json(value: &Value) -> bool {
    match value {
        Value::Json(_) => true,
        Value::Text(s) => serde_json::from_str::<JsonValue>(s).is_ok(),
        _ => false,
    }
}

/// `None` when the rule passes, otherwise the failure message.
fn check_rule(rule: &Rule, label: &str, value: &Value, kind: SizeKind) -> Option<String> {
    let failed = |message: String| Some(message);

    match rule {
        Rule::Required => {
            if is_blank(value) {
                return failed(format!("The {} field is required.", label));
            }
        }
        Rule::Nullable | Rule::Sometimes => {}
        Rule::String => {
            if !matches!(value, Value::Text(_)) {
                return failed(format!("The {} must be a string.", label));
            }
        }
        Rule::Integer => {
            if !is_integer(value) {
                return failed(format!("The {} must be an integer.", label));
            }
        }
        Rule::Boolean => {
            if !is_boolean(value) {
                return failed(format!("The {} field must be true or false.", label));
            }
        }
        Rule::Numeric => {
            if !is_numeric(value) {
                return failed(format!("The {} must be a number.", label));
            }
        }
        Rule::Date => {
            if !is_date(value) {
                return failed(format!("The {} is not a valid date.", label));
            }
        }
        Rule::Uuid => {
            let valid = value
                .as_str()
                .map(|s| uuid::Uuid::parse_str(s).is_ok())
                .unwrap_or(false);
            if !valid {
                return failed(format!("The {} must be a valid UUID.", label));
            }
        }
        Rule::Json => {
            if !is_json(value) {
                return failed(format!("The {} must be a valid JSON string.", label));
            }
        }
        Rule::Array => {
            if !matches!(value, Value::Json(JsonValue::Array(_) | JsonValue::Object(_))) {
                return failed(format!("The {} must be an array.", label));
            }
        }
        Rule::Email => {
            let valid = value.as_str().map(|s| EMAIL_REGEX.is_match(s)).unwrap_or(false);
            if !valid {
                return failed(format!("The {} must be a valid email address.", label));
            }
        }
        Rule::Min(min) => {
            if measure(value, kind).is_none_or(|size| size < *min) {
                return failed(match kind {
                    SizeKind::Items => format!("The {} must have at least {} items.", label, min),
                    _ => format!("The {} must be at least {}{}.", label, min, unit(kind)),
                });
            }
        }
        Rule::Max(max) => {
            if measure(value, kind).is_none_or(|size| size > *max) {
                return failed(match kind {
                    SizeKind::Items => {
                        format!("The {} may not have more than {} items.", label, max)
                    }
                    _ => format!("The {} may not be greater than {}{}.", label, max, unit(kind)),
                });
            }
        }
        Rule::Between(low, high) => {
            if measure(value, kind).is_none_or(|size| size < *low || size > *high) {
                return failed(format!(
                    "The {} must be between {} and {}{}.",
                    label,
                    low,
                    high,
                    unit(kind)
                ));
            }
        }
        Rule::Size(expected) => {
            if measure(value, kind).is_none_or(|size| size != *expected) {
                return failed(match kind {
                    SizeKind::Items => format!("The {} must contain {} items.", label, expected),
                    _ => format!("The {} must be {}{}.", label, expected, unit(kind)),
                });
            }
        }
        Rule::In(allowed) => {
            if !allowed.contains(&to_text(value)) {
                return failed(format!("The selected {} is invalid.", label));
            }
        }
        Rule::NotIn(denied) => {
            if denied.contains(&to_text(value)) {
                return failed(format!("The selected {} is invalid.", label));
            }
        }
        Rule::Regex(regex) => {
            let matched = match value {
                Value::Json(_) => false,
                other => regex.is_match(&to_text(other)),
            };
            if !matched {
                return failed(format!("The {} format is invalid.", label));
            }
        }
    }
    None
}
