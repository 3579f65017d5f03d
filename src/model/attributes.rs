use super::Model;
use crate::cast::{
    CastAs, CastContext, CastTo, cast_as_definition, cast_for_storage, cast_from_storage,
    cast_to_definition, decode_json,
};
use crate::core::{CastType, ModelError, Result, Value};
use crate::schema::SchemaEntry;
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use tracing::{debug, trace};

const JSON_PATH_SEPARATOR: &str = "->";

/// `meta->colour` is governed by the `meta` attribute.
pub(crate) fn base_key(key: &str) -> &str {
    key.split(JSON_PATH_SEPARATOR).next().unwrap_or(key)
}

/// Step into `segment` of a JSON document for writing.
///
/// Null nodes become objects, lists take an index up to their length (which
/// appends), and scalars are never overwritten.
fn json_child_mut<'a>(
    node: &'a mut JsonValue,
    segment: &str,
    key: &str,
) -> Result<&'a mut JsonValue> {
    if node.is_null() {
        *node = JsonValue::Object(Map::new());
    }

    match node {
        JsonValue::Object(map) => Ok(map.entry(segment.to_string()).or_insert(JsonValue::Null)),
        JsonValue::Array(items) => {
            let idx = segment
                .parse::<usize>()
                .ok()
                .filter(|idx| *idx <= items.len())
                .ok_or_else(|| {
                    ModelError::Cast(format!(
                        "'{}' is not a valid index into a list of {} in '{}'",
                        segment,
                        items.len(),
                        key
                    ))
                })?;
            if idx == items.len() {
                items.push(JsonValue::Null);
            }
            Ok(&mut items[idx])
        }
        other => Err(ModelError::Cast(format!(
            "Cannot write '{}' into the {} value at '{}'",
            key,
            json_kind(other),
            segment
        ))),
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

impl Model {
    pub fn valid_attributes(&self) -> Vec<String> {
        self.schema.schema().names()
    }

    pub fn is_valid_attribute(&self, key: &str) -> bool {
        self.schema.schema().contains(base_key(key))
    }

    /// Whether `key` may be written right now.
    ///
    /// Unguarded models allow everything; guarded attributes never pass;
    /// otherwise the attribute's named auth method decides, then a
    /// per-attribute check, and without either the write is allowed.
    pub fn has_write_access(&self, key: &str) -> Result<bool> {
        if self.definition.is_unguarded() {
            return Ok(true);
        }

        let key = base_key(key);
        if self.get_guarded()?.iter().any(|guarded| guarded == key) {
            return Ok(false);
        }

        if let Some(method) = self.get_auth_method(key) {
            if let Some(check) = self.definition.auth_method(&method) {
                return Ok(check(self, key));
            }
        }

        if let Some(check) = self.definition.attribute_auth(key) {
            return Ok(check(self, key));
        }

        Ok(true)
    }

    /// Name of the registered auth method configured for `key`.
    pub fn get_auth_method(&self, key: &str) -> Option<String> {
        let method = self
            .schema
            .schema()
            .get(base_key(key))?
            .text(SchemaEntry::Auth)?;

        if self.definition.auth_method(method).is_some() {
            Some(method.to_string())
        } else {
            trace!(key, method, "auth method is not registered");
            None
        }
    }

    pub fn has_auth_attribute_check(&self, key: &str) -> bool {
        self.definition.attribute_auth(base_key(key)).is_some()
    }

    /// Fill schema defaults on a new model, skipping attributes already set.
    pub fn set_default_values_for_attributes(&mut self) -> Result<&mut Self> {
        if self.exists {
            return Ok(self);
        }

        let dirty = self.get_dirty();
        for (key, value) in self.schema.schema().defaults() {
            if dirty.contains_key(&key) {
                continue;
            }
            self.set_attribute(&key, value)?;
        }
        Ok(self)
    }

    /// Cast per attribute; the key cast comes first on incrementing models.
    pub fn get_casts(&self) -> Vec<(String, String)> {
        let mut casts = Vec::new();
        if self.definition.incrementing() {
            casts.push((
                self.definition.key_name().to_string(),
                self.definition.key_type().to_string(),
            ));
        }

        for (name, cast) in self.schema.schema().text_values(SchemaEntry::Cast) {
            match casts.iter_mut().find(|(attr, _)| *attr == name) {
                Some(entry) => entry.1 = cast,
                None => casts.push((name, cast)),
            }
        }
        casts
    }

    fn cast_type(&self, key: &str) -> Option<CastType> {
        if self.definition.incrementing() && key == self.definition.key_name() {
            let cast = self
                .schema
                .schema()
                .get(key)
                .and_then(|def| def.text(SchemaEntry::Cast))
                .unwrap_or(self.definition.key_type());
            return Some(CastType::parse(cast));
        }

        self.schema
            .schema()
            .get(key)
            .and_then(|def| def.text(SchemaEntry::Cast))
            .map(CastType::parse)
    }

    fn cast_context(&self) -> CastContext<'_> {
        CastContext {
            date_format: self.definition.date_format(),
        }
    }

    pub fn get_cast_as_method(&self, key: &str) -> Option<CastAs> {
        self.cast_type(key).and_then(|cast| cast_as_definition(&cast))
    }

    pub fn get_cast_to_method(&self, key: &str) -> Option<CastTo> {
        self.cast_type(key).and_then(|cast| cast_to_definition(&cast))
    }

    /// Cast a stored value for reading.
    pub fn cast_attribute(&self, key: &str, value: Value) -> Result<Value> {
        match self.cast_type(key) {
            Some(cast) => cast_from_storage(&cast, value, &self.cast_context()),
            None => Ok(value),
        }
    }

    /// Store a value, bypassing guards.
    ///
    /// A registered set mutator takes over completely. Otherwise the value
    /// goes through the write cast, and `a->b` keys write into the JSON
    /// document held by `a`.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let value = value.into();

        if let Some(mutator) = self.definition.set_mutator(key) {
            let mutated = mutator(value)?;
            self.attributes.insert(key.to_string(), mutated);
            return Ok(self);
        }

        let value = match self.cast_type(key) {
            Some(cast) => cast_for_storage(&cast, value, &self.cast_context())?,
            None => value,
        };

        if key.contains(JSON_PATH_SEPARATOR) {
            return self.fill_json_attribute(key, value);
        }

        self.attributes.insert(key.to_string(), value);
        Ok(self)
    }

    /// Write `value` at a nested path inside a JSON attribute.
    pub fn fill_json_attribute(&mut self, key: &str, value: Value) -> Result<&mut Self> {
        let mut path = key.split(JSON_PATH_SEPARATOR);
        let base = path.next().unwrap_or(key).to_string();
        let segments: Vec<&str> = path.collect();

        let mut document = match self.attributes.get(&base) {
            Some(stored) => decode_json(stored)?,
            None => JsonValue::Null,
        };

        let mut node = &mut document;
        for segment in &segments {
            node = json_child_mut(node, segment, key)?;
        }
        *node = value.to_json();

        trace!(key, "json attribute filled");
        self.attributes.insert(base, Value::Text(document.to_string()));
        Ok(self)
    }

    /// Read an attribute through its read cast.
    pub fn get_attribute(&self, key: &str) -> Result<Value> {
        if key.contains(JSON_PATH_SEPARATOR) {
            let mut path = key.split(JSON_PATH_SEPARATOR);
            let base = path.next().unwrap_or(key);
            let document = match self.attributes.get(base) {
                Some(stored) => decode_json(stored)?,
                None => return Ok(Value::Null),
            };

            let found = path.try_fold(&document, |node, segment| match node {
                JsonValue::Array(items) => {
                    segment.parse::<usize>().ok().and_then(|idx| items.get(idx))
                }
                other => other.get(segment),
            });
            return Ok(found.map(Value::from_json).unwrap_or(Value::Null));
        }

        let raw = self.attributes.get(key).cloned().unwrap_or(Value::Null);
        self.cast_attribute(key, raw)
    }

    /// Guarded single write. Returns whether the value was applied.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<bool> {
        if !self.is_valid_attribute(key) {
            debug!(model = %self.definition.name(), key, "write to unknown attribute dropped");
            return Ok(false);
        }

        if !self.has_write_access(key)? {
            debug!(model = %self.definition.name(), key, "write to protected attribute dropped");
            return Ok(false);
        }

        self.set_attribute(key, value)?;
        Ok(true)
    }

    /// Attributes changed since the last sync, in raw form.
    pub fn get_dirty(&self) -> BTreeMap<String, Value> {
        self.attributes
            .iter()
            .filter(|(key, value)| self.original.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        match self.attributes.get(key) {
            Some(value) => self.original.get(key) != Some(value),
            None => false,
        }
    }

    pub fn sync_original(&mut self) -> &mut Self {
        self.original = self.attributes.clone();
        self
    }

    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelDefinition;
    use crate::schema::{AttributeDef, Schema};
    use serde_json::json;
    use std::sync::Arc;

    fn definition() -> Arc<ModelDefinition> {
        ModelDefinition::builder("profile")
            .schema(
                Schema::new()
                    .with("id", AttributeDef::new().cast("integer").guarded())
                    .with("name", AttributeDef::new().cast("string").fillable())
                    .with("settings", AttributeDef::new().cast("json"))
                    .with("score", AttributeDef::new().cast("decimal:2"))
                    .with("nickname", AttributeDef::new()),
            )
            .set_mutator("nickname", |value| {
                Ok(Value::Text(value.as_str().unwrap_or_default().to_uppercase()))
            })
            .build()
            .unwrap()
    }

    #[test]
    fn test_base_key() {
        assert_eq!(base_key("settings->theme->colour"), "settings");
        assert_eq!(base_key("name"), "name");
    }

    #[test]
    fn test_json_path_round_trip() {
        let mut model = Model::new(definition());
        model.set_attribute("settings->theme->colour", "blue").unwrap();
        model.set_attribute("settings->compact", true).unwrap();

        assert_eq!(
            model.get_attribute("settings").unwrap(),
            Value::Json(json!({"theme": {"colour": "blue"}, "compact": true}))
        );
        assert_eq!(model.get_attribute("settings->theme->colour").unwrap(), Value::from("blue"));
        assert_eq!(model.get_attribute("settings->missing").unwrap(), Value::Null);
        assert!(model.is_valid_attribute("settings->theme"));
    }

    #[test]
    fn test_json_path_into_lists() {
        let mut model = Model::new(definition());
        model.set_attribute("settings", Value::Json(json!({"tags": ["a", "b"]}))).unwrap();

        model.set_attribute("settings->tags->0", "z").unwrap();
        model.set_attribute("settings->tags->2", "c").unwrap();
        assert_eq!(
            model.get_attribute("settings").unwrap(),
            Value::Json(json!({"tags": ["z", "b", "c"]}))
        );
        assert_eq!(model.get_attribute("settings->tags->1").unwrap(), Value::from("b"));
    }

    #[test]
    fn test_json_path_keeps_data_on_bad_segment() {
        let mut model = Model::new(definition());
        let stored = json!({"tags": ["a"], "theme": "dark"});
        model.set_attribute("settings", Value::Json(stored.clone())).unwrap();

        for key in ["settings->tags->5", "settings->tags->first", "settings->theme->colour"] {
            assert!(matches!(model.set_attribute(key, "x"), Err(ModelError::Cast(_))));
        }
        assert_eq!(model.get_attribute("settings").unwrap(), Value::Json(stored));
    }

    #[test]
    fn test_mutator_replaces_cast() {
        let mut model = Model::new(definition());
        model.set_attribute("nickname", "ace").unwrap();
        assert_eq!(model.get_raw("nickname"), Some(&Value::from("ACE")));
    }

    #[test]
    fn test_decimal_read_cast() {
        let mut model = Model::new(definition());
        model.set_attribute("score", 3.14159).unwrap();
        assert_eq!(model.get_attribute("score").unwrap(), Value::from("3.14"));
    }

    #[test]
    fn test_key_cast_from_key_type() {
        let model = Model::new(definition());
        assert_eq!(model.get_cast_as_method("id"), Some(CastAs::Int));
        assert_eq!(model.get_cast_to_method("settings"), Some(CastTo::Json));
        assert_eq!(model.get_cast_as_method("nickname"), None);
    }

    #[test]
    fn test_dirty_tracking() {
        let mut model = Model::new(definition());
        model.set_attribute("name", "Ada").unwrap();
        assert!(model.is_dirty("name"));

        model.sync_original();
        assert!(model.get_dirty().is_empty());

        model.set_attribute("name", "Ada").unwrap();
        assert!(!model.is_dirty("name"));
        model.set_attribute("name", "Grace").unwrap();
        assert_eq!(model.get_dirty().keys().collect::<Vec<_>>(), vec!["name"]);
    }
}
