use crate::core::{ModelError, Result};
use crate::model::ModelDefinition;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Model definitions by name.
///
/// The global registry plays the role of class-level static schema storage:
/// any code holding a model name can look its definition up.
pub struct SchemaRegistry {
    definitions: RwLock<HashMap<String, Arc<ModelDefinition>>>,
}

lazy_static! {
    static ref GLOBAL_REGISTRY: SchemaRegistry = SchemaRegistry::new();
}

impl SchemaRegistry {
    /// Get the process-wide registry.
    pub fn global() -> &'static SchemaRegistry {
        &GLOBAL_REGISTRY
    }

    pub fn new() -> Self {
        Self {
            definitions: RwLock::new(HashMap::new()),
        }
    }

    /// Register a definition, replacing any previous one with the same name.
    pub fn register(&self, definition: Arc<ModelDefinition>) -> Result<Arc<ModelDefinition>> {
        let name = definition.name().to_string();
        let mut definitions = self.definitions.write()?;
        if definitions.insert(name.clone(), Arc::clone(&definition)).is_some() {
            debug!(model = %name, "model definition replaced");
        }
        Ok(definition)
    }

    pub fn get(&self, name: &str) -> Result<Arc<ModelDefinition>> {
        self.definitions
            .read()?
            .get(name)
            .cloned()
            .ok_or_else(|| ModelError::ModelNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions
            .read()
            .map(|definitions| definitions.contains_key(name))
            .unwrap_or(false)
    }

    pub fn names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.definitions.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn remove(&self, name: &str) -> Result<Option<Arc<ModelDefinition>>> {
        Ok(self.definitions.write()?.remove(name))
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
