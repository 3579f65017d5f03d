//! Per-attribute schema: the static configuration a model class declares.
//!
//! A [`Schema`] keeps attributes in declaration order; every list derived
//! from it (valid attributes, casts, rules, guarded sets) follows that order.

mod attribute;
mod cache;
mod registry;
mod resolver;

pub use attribute::{AttributeDef, EntryValue, SchemaEntry};
pub use cache::EntryCache;
pub use registry::SchemaRegistry;
pub use resolver::SchemaResolver;

use crate::core::{Result, Value};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    attributes: Vec<(String, AttributeDef)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an attribute, keeping its original position on replace.
    pub fn with(mut self, name: &str, def: AttributeDef) -> Self {
        self.insert(name, def);
        self
    }

    pub fn insert(&mut self, name: &str, def: AttributeDef) {
        match self.position(name) {
            Some(idx) => self.attributes[idx].1 = def,
            None => self.attributes.push((name.to_string(), def)),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|(attr, _)| attr == name)
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDef> {
        self.position(name).map(|idx| &self.attributes[idx].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AttributeDef> {
        let idx = self.position(name)?;
        Some(&mut self.attributes[idx].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeDef)> {
        self.attributes.iter().map(|(name, def)| (name.as_str(), def))
    }

    pub fn names(&self) -> Vec<String> {
        self.attributes.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Names of attributes whose flag is true or whose value entry is set.
    pub fn names_with(&self, entry: SchemaEntry) -> Vec<String> {
        self.iter()
            .filter(|(_, def)| def.has(entry))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Name/value pairs for every attribute that sets `entry`.
    pub fn values_of(&self, entry: SchemaEntry) -> Vec<(String, EntryValue)> {
        self.iter()
            .filter(|(_, def)| def.has(entry))
            .filter_map(|(name, def)| def.entry_value(entry).map(|v| (name.to_string(), v)))
            .collect()
    }

    /// Text entries (`cast`, `cast-back`, `rules`, `auth`) as plain pairs.
    pub fn text_values(&self, entry: SchemaEntry) -> Vec<(String, String)> {
        self.iter()
            .filter_map(|(name, def)| {
                def.text(entry)
                    .map(|text| (name.to_string(), text.to_string()))
            })
            .collect()
    }

    pub fn defaults(&self) -> Vec<(String, Value)> {
        self.iter()
            .filter_map(|(name, def)| {
                def.default
                    .as_ref()
                    .map(|json| (name.to_string(), Value::from_json(json)))
            })
            .collect()
    }

    /// Overlay `overrides` onto this schema. Fields set by the override win;
    /// attributes only the override knows are appended.
    pub fn merge(&self, overrides: &Schema) -> Schema {
        let mut merged = self.clone();
        for (name, overlay) in overrides.iter() {
            match merged.get_mut(name) {
                Some(def) => *def = def.merged(overlay),
                None => merged.attributes.push((name.to_string(), overlay.clone())),
            }
        }
        merged
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len()))?;
        for (name, def) in &self.attributes {
            map.serialize_entry(name, def)?;
        }
        map.end()
    }
}

struct SchemaVisitor;

impl<'de> Visitor<'de> for SchemaVisitor {
    type Value = Schema;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a map of attribute names to attribute definitions")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Schema, A::Error> {
        let mut schema = Schema::new();
        while let Some((name, def)) = access.next_entry::<String, AttributeDef>()? {
            schema.insert(&name, def);
        }
        Ok(schema)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(SchemaVisitor)
    }
}
