use crate::core::{ModelError, Result, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// Keys an attribute definition may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaEntry {
    Cast,
    CastBack,
    Rules,
    Default,
    Fillable,
    Guarded,
    GuardedCreate,
    GuardedUpdate,
    Hidden,
    Visible,
    Auth,
}

impl SchemaEntry {
    pub const ALL: [SchemaEntry; 11] = [
        Self::Cast,
        Self::CastBack,
        Self::Rules,
        Self::Default,
        Self::Fillable,
        Self::Guarded,
        Self::GuardedCreate,
        Self::GuardedUpdate,
        Self::Hidden,
        Self::Visible,
        Self::Auth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cast => "cast",
            Self::CastBack => "cast-back",
            Self::Rules => "rules",
            Self::Default => "default",
            Self::Fillable => "fillable",
            Self::Guarded => "guarded",
            Self::GuardedCreate => "guarded-create",
            Self::GuardedUpdate => "guarded-update",
            Self::Hidden => "hidden",
            Self::Visible => "visible",
            Self::Auth => "auth",
        }
    }

    /// Flag entries hold booleans; the others hold a value.
    pub fn is_flag(&self) -> bool {
        matches!(
            self,
            Self::Fillable
                | Self::Guarded
                | Self::GuardedCreate
                | Self::GuardedUpdate
                | Self::Hidden
                | Self::Visible
        )
    }
}

impl fmt::Display for SchemaEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SchemaEntry {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|entry| entry.as_str() == s)
            .ok_or_else(|| ModelError::InvalidSchema(format!("Unknown schema entry '{}'", s)))
    }
}

/// Value of one entry on one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValue {
    Flag(bool),
    Text(String),
    Value(Value),
}

impl EntryValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for EntryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(b) => write!(f, "{}", b),
            Self::Text(s) => write!(f, "{}", s),
            Self::Value(v) => write!(f, "{}", v),
        }
    }
}

/// Declarative metadata for a single attribute.
///
/// Every field is optional so the same type doubles as a partial override:
/// merging copies each field that the overlay sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct AttributeDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast_back: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fillable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarded_create: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarded_update: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
}

impl AttributeDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cast(mut self, cast: &str) -> Self {
        self.cast = Some(cast.to_string());
        self
    }

    /// Cast used only for validation, e.g. dates read as datetime but saved as integers.
    pub fn cast_back(mut self, cast: &str) -> Self {
        self.cast_back = Some(cast.to_string());
        self
    }

    pub fn rules(mut self, rules: &str) -> Self {
        self.rules = Some(rules.to_string());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into().to_json());
        self
    }

    pub fn fillable(mut self) -> Self {
        self.fillable = Some(true);
        self
    }

    pub fn guarded(mut self) -> Self {
        self.guarded = Some(true);
        self
    }

    pub fn guarded_create(mut self) -> Self {
        self.guarded_create = Some(true);
        self
    }

    pub fn guarded_update(mut self) -> Self {
        self.guarded_update = Some(true);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = Some(true);
        self
    }

    pub fn visible(mut self) -> Self {
        self.visible = Some(true);
        self
    }

    pub fn auth(mut self, method: &str) -> Self {
        self.auth = Some(method.to_string());
        self
    }

    pub fn flag(&self, entry: SchemaEntry) -> Option<bool> {
        match entry {
            SchemaEntry::Fillable => self.fillable,
            SchemaEntry::Guarded => self.guarded,
            SchemaEntry::GuardedCreate => self.guarded_create,
            SchemaEntry::GuardedUpdate => self.guarded_update,
            SchemaEntry::Hidden => self.hidden,
            SchemaEntry::Visible => self.visible,
            _ => None,
        }
    }

    pub fn set_flag(&mut self, entry: SchemaEntry, value: bool) -> Result<()> {
        let slot = match entry {
            SchemaEntry::Fillable => &mut self.fillable,
            SchemaEntry::Guarded => &mut self.guarded,
            SchemaEntry::GuardedCreate => &mut self.guarded_create,
            SchemaEntry::GuardedUpdate => &mut self.guarded_update,
            SchemaEntry::Hidden => &mut self.hidden,
            SchemaEntry::Visible => &mut self.visible,
            other => {
                return Err(ModelError::InvalidSchema(format!(
                    "Entry '{}' is not a flag",
                    other
                )));
            }
        };
        *slot = Some(value);
        Ok(())
    }

    pub fn text(&self, entry: SchemaEntry) -> Option<&str> {
        match entry {
            SchemaEntry::Cast => self.cast.as_deref(),
            SchemaEntry::CastBack => self.cast_back.as_deref(),
            SchemaEntry::Rules => self.rules.as_deref(),
            SchemaEntry::Auth => self.auth.as_deref(),
            _ => None,
        }
    }

    /// Whether the entry counts as set: a true flag or a present value.
    pub fn has(&self, entry: SchemaEntry) -> bool {
        if entry.is_flag() {
            return self.flag(entry).unwrap_or(false);
        }
        match entry {
            SchemaEntry::Default => self.default.is_some(),
            other => self.text(other).is_some(),
        }
    }

    pub fn entry_value(&self, entry: SchemaEntry) -> Option<EntryValue> {
        if entry.is_flag() {
            return self.flag(entry).map(EntryValue::Flag);
        }
        match entry {
            SchemaEntry::Default => self
                .default
                .as_ref()
                .map(|json| EntryValue::Value(Value::from_json(json))),
            other => self.text(other).map(|s| EntryValue::Text(s.to_string())),
        }
    }

    /// Field-wise merge; fields set on `overlay` win.
    pub fn merged(&self, overlay: &AttributeDef) -> AttributeDef {
        AttributeDef {
            cast: overlay.cast.clone().or_else(|| self.cast.clone()),
            cast_back: overlay.cast_back.clone().or_else(|| self.cast_back.clone()),
            rules: overlay.rules.clone().or_else(|| self.rules.clone()),
            default: overlay.default.clone().or_else(|| self.default.clone()),
            fillable: overlay.fillable.or(self.fillable),
            guarded: overlay.guarded.or(self.guarded),
            guarded_create: overlay.guarded_create.or(self.guarded_create),
            guarded_update: overlay.guarded_update.or(self.guarded_update),
            hidden: overlay.hidden.or(self.hidden),
            visible: overlay.visible.or(self.visible),
            auth: overlay.auth.clone().or_else(|| self.auth.clone()),
        }
    }
}
