use crate::core::{ModelError, Result};
use lazy_static::lazy_static;
use lru::LruCache;
use regex::Regex;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

lazy_static! {
    static ref RULE_REGEX_CACHE: Mutex<LruCache<String, Arc<Regex>>> =
        Mutex::new(LruCache::new(NonZeroUsize::new(128).unwrap()));
    pub(crate) static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// A single parsed validation rule token.
#[derive(Debug, Clone)]
pub enum Rule {
    Required,
    Nullable,
    Sometimes,
    String,
    Integer,
    Boolean,
    Numeric,
    Date,
    Uuid,
    Json,
    Array,
    Email,
    Min(f64),
    Max(f64),
    Between(f64, f64),
    Size(f64),
    In(Vec<String>),
    NotIn(Vec<String>),
    Regex(Arc<Regex>),
}

impl Rule {
    /// Parse one `name[:parameters]` token.
    pub fn parse(token: &str) -> Result<Rule> {
        let token = token.trim();
        let (name, params) = match token.split_once(':') {
            Some((name, params)) => (name, Some(params)),
            None => (token, None),
        };

        let rule = match (name, params) {
            ("required", None) => Self::Required,
            ("nullable", None) => Self::Nullable,
            ("sometimes", None) => Self::Sometimes,
            ("string", None) => Self::String,
            ("integer", None) => Self::Integer,
            ("boolean", None) => Self::Boolean,
            ("numeric", None) => Self::Numeric,
            ("date", None) => Self::Date,
            ("uuid", None) => Self::Uuid,
            ("json", None) => Self::Json,
            ("array", None) => Self::Array,
            ("email", None) => Self::Email,
            ("min", Some(p)) => Self::Min(parse_number(token, p)?),
            ("max", Some(p)) => Self::Max(parse_number(token, p)?),
            ("size", Some(p)) => Self::Size(parse_number(token, p)?),
            ("between", Some(p)) => {
                let (low, high) = p.split_once(',').ok_or_else(|| {
                    ModelError::InvalidRule(format!("'{}' needs two bounds", token))
                })?;
                Self::Between(parse_number(token, low)?, parse_number(token, high)?)
            }
            ("in", Some(p)) => Self::In(parse_list(p)),
            ("not_in", Some(p)) => Self::NotIn(parse_list(p)),
            ("regex", Some(p)) => Self::Regex(compile_pattern(p)?),
            _ => return Err(ModelError::InvalidRule(token.to_string())),
        };
        Ok(rule)
    }

    /// Parse a `|`-separated rule string. Blank segments are skipped.
    pub fn parse_all(rules: &str) -> Result<Vec<Rule>> {
        rules
            .split('|')
            .filter(|token| !token.trim().is_empty())
            .map(Rule::parse)
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Nullable => "nullable",
            Self::Sometimes => "sometimes",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::Uuid => "uuid",
            Self::Json => "json",
            Self::Array => "array",
            Self::Email => "email",
            Self::Min(_) => "min",
            Self::Max(_) => "max",
            Self::Between(..) => "between",
            Self::Size(_) => "size",
            Self::In(_) => "in",
            Self::NotIn(_) => "not_in",
            Self::Regex(_) => "regex",
        }
    }

    /// Implicit rules run even when the field is absent or blank.
    pub fn is_implicit(&self) -> bool {
        matches!(self, Self::Required)
    }

    /// Rules that only steer how the others run.
    pub fn is_modifier(&self) -> bool {
        matches!(self, Self::Nullable | Self::Sometimes)
    }
}

fn parse_number(token: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ModelError::InvalidRule(format!("'{}' has a non-numeric parameter", token)))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',').map(|item| item.trim().to_string()).collect()
}

/// Compile a `regex:` parameter. Slash delimiters and trailing `i`/`m`/`s`
/// flags are accepted, as in `regex:/^[a-z]+$/i`.
fn compile_pattern(raw: &str) -> Result<Arc<Regex>> {
    let mut cache = RULE_REGEX_CACHE.lock()?;
    if let Some(regex) = cache.get(raw) {
        return Ok(Arc::clone(regex));
    }

    let pattern = match raw.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
        Some((body, flags)) if flags.chars().all(|c| matches!(c, 'i' | 'm' | 's')) => {
            if flags.is_empty() {
                body.to_string()
            } else {
                format!("(?{}){}", flags, body)
            }
        }
        _ => raw.to_string(),
    };

    let regex = Regex::new(&pattern)
        .map(Arc::new)
        .map_err(|e| ModelError::InvalidRule(format!("regex:{} ({})", raw, e)))?;
    cache.put(raw.to_string(), Arc::clone(&regex));
    Ok(regex)
}
