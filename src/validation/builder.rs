//! Derives validation rule strings from a schema's casts and explicit rules.

use crate::cast::{numeric_prefix, to_bool, to_int, to_text};
use crate::core::{CastType, Value};

/// Input for [`attribute_rules`]; each list follows schema declaration order.
#[derive(Debug, Clone, Copy)]
pub struct RuleSources<'a> {
    pub names: &'a [String],
    pub casts: &'a [(String, String)],
    pub cast_backs: &'a [(String, String)],
    pub explicit: &'a [(String, String)],
    pub key_name: &'a str,
    pub exists: bool,
}

/// Build `attribute → "token|token"` pairs.
///
/// Cast-back entries replace casts for validation purposes. Every cast adds
/// its validation type (plus `sometimes` once the model exists), explicit
/// rules follow, and the key attribute is left out.
pub fn attribute_rules(sources: RuleSources<'_>) -> Vec<(String, String)> {
    let mut tokens: Vec<(String, Vec<String>)> = sources
        .names
        .iter()
        .map(|name| (name.clone(), Vec::new()))
        .collect();

    let mut casts: Vec<(String, String)> = sources.casts.to_vec();
    for (name, cast) in sources.cast_backs {
        match casts.iter_mut().find(|(attr, _)| attr == name) {
            Some(entry) => entry.1 = cast.clone(),
            None => casts.push((name.clone(), cast.clone())),
        }
    }

    for (name, cast) in &casts {
        let idx = slot(&mut tokens, name);
        if let Some(token) = CastType::parse(cast).validation_type() {
            tokens[idx].1.push(token.to_string());
        }
        if sources.exists {
            tokens[idx].1.push("sometimes".to_string());
        }
    }

    for (name, rules) in sources.explicit {
        let idx = slot(&mut tokens, name);
        tokens[idx].1.extend(
            rules
                .split('|')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        );
    }

    tokens
        .into_iter()
        .filter(|(name, list)| name != sources.key_name && !list.is_empty())
        .map(|(name, list)| (name, list.join("|")))
        .collect()
}

fn slot(tokens: &mut Vec<(String, Vec<String>)>, name: &str) -> usize {
    match tokens.iter().position(|(attr, _)| attr == name) {
        Some(idx) => idx,
        None => {
            tokens.push((name.to_string(), Vec::new()));
            tokens.len() - 1
        }
    }
}

/// Coerce a dirty value by the first token of its rule string, then null it
/// out when it is empty and the rules allow `nullable`.
pub fn pre_validation_value(value: &Value, rules: &str) -> Value {
    let tokens: Vec<&str> = rules.split('|').map(str::trim).collect();
    let nullable = tokens.contains(&"nullable");

    let cast = match tokens.first().copied() {
        Some("string") => match value {
            Value::Text(_) | Value::Json(_) => value.clone(),
            other => Value::Text(to_text(other)),
        },
        Some("boolean") => Value::Boolean(to_bool(value)),
        Some("integer") => to_int(value).map(Value::Integer).unwrap_or_else(|_| value.clone()),
        Some("numeric") => match value {
            Value::Integer(_) | Value::Float(_) => value.clone(),
            other => Value::Float(strip_numeric(&to_text(other))),
        },
        _ => value.clone(),
    };

    if nullable && cast.is_empty_like() {
        Value::Null
    } else {
        cast
    }
}

/// Keep digits, dots and a leading minus sign, then read the longest
/// numeric prefix: `"1.2.3"` is `1.2`.
fn strip_numeric(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let negative = trimmed.starts_with('-');
    let digits: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    let number = numeric_prefix(&digits, true).parse::<f64>().unwrap_or(0.0);
    if negative { -number } else { number }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn test_rules_from_casts() {
        let names: Vec<String> = ["id", "name", "age", "meta", "note"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let casts = pairs(&[
            ("id", "int"),
            ("name", "string"),
            ("age", "int"),
            ("meta", "array"),
            ("note", "custom"),
        ]);
        let explicit = pairs(&[("name", "required|min:2")]);

        let rules = attribute_rules(RuleSources {
            names: &names,
            casts: &casts,
            cast_backs: &[],
            explicit: &explicit,
            key_name: "id",
            exists: false,
        });

        assert_eq!(
            rules,
            pairs(&[("name", "string|required|min:2"), ("age", "integer"), ("meta", "json")])
        );
    }

    #[test]
    fn test_cast_back_and_sometimes() {
        let names: Vec<String> = vec!["published_at".into()];
        let casts = pairs(&[("published_at", "datetime")]);
        let cast_backs = pairs(&[("published_at", "timestamp")]);

        let rules = attribute_rules(RuleSources {
            names: &names,
            casts: &casts,
            cast_backs: &cast_backs,
            explicit: &[],
            key_name: "id",
            exists: true,
        });

        assert_eq!(rules, pairs(&[("published_at", "integer|sometimes")]));
    }

    #[test]
    fn test_pre_validation_value() {
        assert_eq!(pre_validation_value(&Value::Integer(1), "boolean"), Value::Boolean(true));
        assert_eq!(pre_validation_value(&Value::from("42"), "integer|min:1"), Value::Integer(42));
        assert_eq!(
            pre_validation_value(&Value::from("$-1,250.50"), "numeric"),
            Value::Float(1250.5)
        );
        assert_eq!(pre_validation_value(&Value::from("-3.5"), "numeric"), Value::Float(-3.5));
        assert_eq!(pre_validation_value(&Value::from("1.2.3"), "numeric"), Value::Float(1.2));
        assert_eq!(pre_validation_value(&Value::from("v.5"), "numeric"), Value::Float(0.5));
        assert_eq!(pre_validation_value(&Value::from("n/a"), "numeric"), Value::Float(0.0));
        assert_eq!(pre_validation_value(&Value::Integer(7), "string"), Value::from("7"));
        assert_eq!(pre_validation_value(&Value::from(""), "string|nullable"), Value::Null);
        assert_eq!(pre_validation_value(&Value::from("x"), "date"), Value::from("x"));
    }
}
