use super::Model;
use crate::cast::{DEFAULT_DATE_FORMAT, decimal_digits};
use crate::core::{CastType, ModelError, Result, Value};
use crate::schema::{EntryCache, EntryValue, Schema, SchemaEntry};
use crate::validation::Rule;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Decides whether the current caller may write an attribute.
pub type AuthCheck = Arc<dyn Fn(&Model, &str) -> bool + Send + Sync>;

/// Transforms a value before it is stored; the result is kept as is.
pub type SetMutator = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

const TIMESTAMP_COLUMNS: [&str; 2] = ["created_at", "updated_at"];

/// Static, class-level configuration of a model.
pub struct ModelDefinition {
    name: String,
    table: String,
    key_name: String,
    key_type: String,
    incrementing: bool,
    timestamps: bool,
    date_format: String,
    schema: Arc<Schema>,
    auth_methods: HashMap<String, AuthCheck>,
    attribute_auth: HashMap<String, AuthCheck>,
    set_mutators: HashMap<String, SetMutator>,
    unguarded: AtomicBool,
    cache: EntryCache,
}

impl ModelDefinition {
    pub fn builder(name: &str) -> ModelDefinitionBuilder {
        ModelDefinitionBuilder::new(name)
    }

    /// Load a definition from a JSON document:
    ///
    /// ```json
    /// { "name": "post", "table": "posts", "schema": { "title": { "cast": "string" } } }
    /// ```
    ///
    /// Auth checks and mutators are code and cannot come from JSON; use
    /// [`ModelDefinition::builder_from_json_str`] to add them afterwards.
    pub fn from_json_str(json: &str) -> Result<Arc<Self>> {
        Self::builder_from_json_str(json)?.build()
    }

    pub fn builder_from_json_str(json: &str) -> Result<ModelDefinitionBuilder> {
        let document: DefinitionDocument = serde_json::from_str(json)?;
        let mut builder = Self::builder(&document.name).schema(document.schema);
        if let Some(table) = document.table {
            builder = builder.table(&table);
        }
        if let Some(key_name) = document.key_name {
            builder = builder.key_name(&key_name);
        }
        if let Some(key_type) = document.key_type {
            builder = builder.key_type(&key_type);
        }
        if let Some(incrementing) = document.incrementing {
            builder = builder.incrementing(incrementing);
        }
        if let Some(timestamps) = document.timestamps {
            builder = builder.timestamps(timestamps);
        }
        if let Some(date_format) = document.date_format {
            builder = builder.date_format(&date_format);
        }
        Ok(builder)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    pub fn key_type(&self) -> &str {
        &self.key_type
    }

    pub fn incrementing(&self) -> bool {
        self.incrementing
    }

    pub fn timestamps(&self) -> bool {
        self.timestamps
    }

    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Names of attributes carrying `entry` in the static schema.
    pub fn from_schema(&self, entry: SchemaEntry) -> Result<Arc<Vec<String>>> {
        let schema = &self.schema;
        self.cache.get_or_insert_with(entry, || schema.names_with(entry))
    }

    /// Name/value pairs for `entry` in the static schema.
    pub fn from_schema_values(&self, entry: SchemaEntry) -> Vec<(String, EntryValue)> {
        self.schema.values_of(entry)
    }

    pub fn auth_method(&self, name: &str) -> Option<&AuthCheck> {
        self.auth_methods.get(name)
    }

    pub fn attribute_auth(&self, key: &str) -> Option<&AuthCheck> {
        self.attribute_auth.get(key)
    }

    pub fn set_mutator(&self, key: &str) -> Option<&SetMutator> {
        self.set_mutators.get(key)
    }

    /// Disable guarding for every instance of this model.
    pub fn unguard(&self) {
        self.unguarded.store(true, Ordering::SeqCst);
    }

    pub fn reguard(&self) {
        self.unguarded.store(false, Ordering::SeqCst);
    }

    pub fn is_unguarded(&self) -> bool {
        self.unguarded.load(Ordering::SeqCst)
    }

    /// Run `f` with guarding disabled, restoring the previous state after.
    pub fn unguarded<T>(&self, f: impl FnOnce() -> T) -> T {
        let _restore = UnguardRestore {
            flag: &self.unguarded,
            previous: self.unguarded.swap(true, Ordering::SeqCst),
        };
        f()
    }
}

/// Puts the unguarded flag back when dropped, unwinding included.
struct UnguardRestore<'a> {
    flag: &'a AtomicBool,
    previous: bool,
}

impl Drop for UnguardRestore<'_> {
    fn drop(&mut self) {
        self.flag.store(self.previous, Ordering::SeqCst);
    }
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("name", &self.name)
            .field("table", &self.table)
            .field("key_name", &self.key_name)
            .field("key_type", &self.key_type)
            .field("incrementing", &self.incrementing)
            .field("timestamps", &self.timestamps)
            .field("attributes", &self.schema.names())
            .field("auth_methods", &self.auth_methods.keys().collect::<Vec<_>>())
            .field("unguarded", &self.is_unguarded())
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DefinitionDocument {
    name: String,
    table: Option<String>,
    key_name: Option<String>,
    key_type: Option<String>,
    incrementing: Option<bool>,
    timestamps: Option<bool>,
    date_format: Option<String>,
    #[serde(default)]
    schema: Schema,
}

/// Builder for [`ModelDefinition`].
pub struct ModelDefinitionBuilder {
    name: String,
    table: Option<String>,
    key_name: String,
    key_type: String,
    incrementing: bool,
    timestamps: bool,
    date_format: String,
    schema: Schema,
    auth_methods: HashMap<String, AuthCheck>,
    attribute_auth: HashMap<String, AuthCheck>,
    set_mutators: HashMap<String, SetMutator>,
}

impl ModelDefinitionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            table: None,
            key_name: "id".to_string(),
            key_type: "int".to_string(),
            incrementing: true,
            timestamps: true,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            schema: Schema::new(),
            auth_methods: HashMap::new(),
            attribute_auth: HashMap::new(),
            set_mutators: HashMap::new(),
        }
    }

    /// Table name; defaults to the model name.
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    pub fn key_name(mut self, key_name: &str) -> Self {
        self.key_name = key_name.to_string();
        self
    }

    pub fn key_type(mut self, key_type: &str) -> Self {
        self.key_type = key_type.to_string();
        self
    }

    pub fn incrementing(mut self, incrementing: bool) -> Self {
        self.incrementing = incrementing;
        self
    }

    pub fn timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// `chrono` format used for date columns in storage.
    pub fn date_format(mut self, format: &str) -> Self {
        self.date_format = format.to_string();
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Register a named auth method that attributes can refer to via `auth`.
    pub fn auth_method<F>(mut self, name: &str, check: F) -> Self
    where
        F: Fn(&Model, &str) -> bool + Send + Sync + 'static,
    {
        self.auth_methods.insert(name.to_string(), Arc::new(check));
        self
    }

    /// Register a write check for a single attribute.
    pub fn attribute_auth<F>(mut self, key: &str, check: F) -> Self
    where
        F: Fn(&Model, &str) -> bool + Send + Sync + 'static,
    {
        self.attribute_auth.insert(key.to_string(), Arc::new(check));
        self
    }

    pub fn set_mutator<F>(mut self, key: &str, mutator: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.set_mutators.insert(key.to_string(), Arc::new(mutator));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ModelError::InvalidSchema("Model name cannot be empty".into()));
        }

        if self.key_name.trim().is_empty() {
            return Err(ModelError::InvalidSchema(format!(
                "Model '{}' needs a key name",
                self.name
            )));
        }

        if self.date_format.trim().is_empty() {
            return Err(ModelError::InvalidSchema(format!(
                "Model '{}' has an empty date format",
                self.name
            )));
        }

        for (name, def) in self.schema.iter() {
            if name.is_empty() || name.contains("->") {
                return Err(ModelError::InvalidSchema(format!(
                    "Invalid attribute name '{}' on model '{}'",
                    name, self.name
                )));
            }

            for entry in [SchemaEntry::Cast, SchemaEntry::CastBack] {
                if let Some(cast) = def.text(entry) {
                    let cast = CastType::parse(cast);
                    if cast.base() == "decimal" {
                        decimal_digits(&cast).map_err(|e| {
                            ModelError::InvalidSchema(format!("Attribute '{}': {}", name, e))
                        })?;
                    }
                }
            }

            if let Some(rules) = def.text(SchemaEntry::Rules) {
                Rule::parse_all(rules)?;
            }
        }

        Ok(())
    }

    pub fn build(self) -> Result<Arc<ModelDefinition>> {
        self.validate()?;

        let mut schema = self.schema;
        if self.timestamps {
            for column in TIMESTAMP_COLUMNS {
                if let Some(def) = schema.get_mut(column) {
                    if def.guarded.is_none() {
                        def.guarded = Some(true);
                    }
                }
            }
        }

        Ok(Arc::new(ModelDefinition {
            table: self.table.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            key_name: self.key_name,
            key_type: self.key_type,
            incrementing: self.incrementing,
            timestamps: self.timestamps,
            date_format: self.date_format,
            schema: Arc::new(schema),
            auth_methods: self.auth_methods,
            attribute_auth: self.attribute_auth,
            set_mutators: self.set_mutators,
            unguarded: AtomicBool::new(false),
            cache: EntryCache::new(),
        }))
    }
}
