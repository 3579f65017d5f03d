use std::fmt;

/// A parsed cast declaration: `base[:parameter]`.
///
/// `decimal:2` has base `decimal` and parameter `2`; `datetime:%d/%m/%Y`
/// carries a `chrono` format string as its parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CastType {
    base: String,
    parameter: Option<String>,
}

impl CastType {
    pub fn parse(cast: &str) -> Self {
        match cast.split_once(':') {
            Some((base, parameter)) => Self {
                base: base.trim().to_string(),
                parameter: Some(parameter.to_string()),
            },
            None => Self {
                base: cast.trim().to_string(),
                parameter: None,
            },
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn parameter(&self) -> Option<&str> {
        self.parameter.as_deref()
    }

    /// The validation rule token implied by this cast.
    ///
    /// Casts without an obvious rule contribute nothing rather than their own
    /// name, which the validator would reject as an unknown rule.
    pub fn validation_type(&self) -> Option<&'static str> {
        match self.base.as_str() {
            "bool" | "boolean" => Some("boolean"),
            "int" | "integer" | "timestamp" => Some("integer"),
            "real" | "float" | "double" | "decimal" => Some("numeric"),
            "date" | "datetime" => Some("date"),
            "string" => Some("string"),
            "uuid" => Some("uuid"),
            "array" | "json" | "object" | "collection" => Some("json"),
            _ => None,
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self.base.as_str(), "date" | "datetime")
    }
}

impl fmt::Display for CastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parameter {
            Some(parameter) => write!(f, "{}:{}", self.base, parameter),
            None => write!(f, "{}", self.base),
        }
    }
}
