//! Model instances and their class-level definitions.
//!
//! A [`ModelDefinition`] holds what every instance of a model shares: the
//! static schema, key settings, auth checks and mutators. A [`Model`] is one
//! row's worth of attributes plus the instance's schema overrides.

mod attributes;
mod definition;
mod guards;
mod hides;
mod lifecycle;

pub use definition::{AuthCheck, ModelDefinition, ModelDefinitionBuilder, SetMutator};

use crate::core::{Result, Value};
use crate::schema::{SchemaRegistry, SchemaResolver};
use crate::validation::Validator;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct Model {
    definition: Arc<ModelDefinition>,
    schema: SchemaResolver,
    attributes: BTreeMap<String, Value>,
    original: BTreeMap<String, Value>,
    exists: bool,
    validator: Option<Validator>,
}

impl Model {
    pub fn new(definition: Arc<ModelDefinition>) -> Self {
        Self {
            schema: SchemaResolver::new(Arc::clone(definition.schema())),
            definition,
            attributes: BTreeMap::new(),
            original: BTreeMap::new(),
            exists: false,
            validator: None,
        }
    }

    /// New instance of a model registered in the global registry.
    pub fn named(name: &str) -> Result<Self> {
        Ok(Self::new(SchemaRegistry::global().get(name)?))
    }

    /// Instance for a row that already exists in storage.
    pub fn from_storage(
        definition: Arc<ModelDefinition>,
        attributes: BTreeMap<String, Value>,
    ) -> Self {
        let mut model = Self::new(definition);
        model.attributes = attributes;
        model.exists = true;
        model.sync_original();
        model
    }

    pub fn definition(&self) -> &Arc<ModelDefinition> {
        &self.definition
    }

    /// This instance's resolved schema.
    pub fn schema(&self) -> &SchemaResolver {
        &self.schema
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn key(&self) -> Option<&Value> {
        self.attributes.get(self.definition.key_name())
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("model", &self.definition.name())
            .field("exists", &self.exists)
            .field("attributes", &self.attributes)
            .finish()
    }
}
