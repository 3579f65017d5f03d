use super::{Model, ModelDefinition};
use crate::core::{ModelError, Result, Value};
use crate::schema::SchemaEntry;
use crate::store::ModelStore;
use crate::validation::{RuleSources, Validator, attribute_rules, pre_validation_value};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

const CREATED_AT: &str = "created_at";
const UPDATED_AT: &str = "updated_at";

impl Model {
    /// Validation rule string per attribute, derived from casts and the
    /// explicit `rules` entries. The key attribute has none.
    pub fn get_attribute_rules(&self) -> Vec<(String, String)> {
        let schema = self.schema.schema();
        let names = schema.names();
        let casts = self.get_casts();
        let cast_backs = schema.text_values(SchemaEntry::CastBack);
        let explicit = schema.text_values(SchemaEntry::Rules);

        attribute_rules(RuleSources {
            names: &names,
            casts: &casts,
            cast_backs: &cast_backs,
            explicit: &explicit,
            key_name: self.definition.key_name(),
            exists: self.exists,
        })
    }

    /// Coerce dirty values to the type their rules expect, e.g. `1` to
    /// `true` for boolean attributes.
    pub fn pre_validation_cast(&mut self) {
        let rules = self.get_attribute_rules();
        for (key, value) in self.get_dirty() {
            let rule = rules
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, rule)| rule.as_str())
                .unwrap_or_default();
            let cast = pre_validation_value(&value, rule);
            self.attributes.insert(key, cast);
        }
    }

    /// Validate the dirty attributes. The validator is kept for
    /// [`Model::get_invalid_attributes`].
    pub fn saving_validation(&mut self) -> Result<bool> {
        self.pre_validation_cast();

        let validator = Validator::make(self.get_dirty(), &self.get_attribute_rules())?;
        let passes = validator.passes();
        self.validator = Some(validator);
        Ok(passes)
    }

    pub fn get_validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    pub fn get_invalid_attributes(&self) -> BTreeMap<String, Vec<String>> {
        self.validator
            .as_ref()
            .map(|validator| validator.errors().messages())
            .unwrap_or_default()
    }

    pub fn get_invalid_message(&self) -> Vec<String> {
        self.validator
            .as_ref()
            .map(|validator| validator.errors().all())
            .unwrap_or_default()
    }

    fn touch_timestamps(&mut self, creating: bool) -> Result<()> {
        if !self.definition.timestamps() {
            return Ok(());
        }

        let now = Value::Timestamp(Utc::now());
        let mut columns = vec![UPDATED_AT];
        if creating {
            columns.insert(0, CREATED_AT);
        }

        for column in columns {
            if self.is_valid_attribute(column) && !self.is_dirty(column) {
                self.set_attribute(column, now.clone())?;
            }
        }
        Ok(())
    }

    /// Persist the model.
    ///
    /// Runs the saving validation first. New models then get their defaults
    /// and timestamps and are inserted; stored models send only their dirty
    /// attributes.
    pub async fn save<S>(&mut self, store: &S) -> Result<()>
    where
        S: ModelStore + ?Sized,
    {
        if !self.saving_validation()? {
            let errors = self
                .validator
                .as_ref()
                .map(|validator| validator.errors().clone())
                .unwrap_or_default();
            warn!(
                model = %self.definition.name(),
                fields = ?errors.keys(),
                "model failed validation"
            );
            return Err(ModelError::Validation {
                model: self.definition.name().to_string(),
                errors,
            });
        }

        let table = self.definition.table().to_string();
        let key_name = self.definition.key_name().to_string();

        if self.exists {
            if self.get_dirty().is_empty() {
                trace!(model = %self.definition.name(), "nothing to save");
                return Ok(());
            }

            self.touch_timestamps(false)?;
            let key = self.key().cloned().ok_or_else(|| {
                ModelError::AttributeNotFound(key_name.clone(), self.definition.name().to_string())
            })?;
            store.update(&table, &key_name, &key, self.get_dirty()).await?;
            debug!(model = %self.definition.name(), store = store.name(), %key, "model updated");
        } else {
            self.set_default_values_for_attributes()?;
            self.touch_timestamps(true)?;

            let generated = store
                .insert(&table, &key_name, self.definition.incrementing(), self.attributes.clone())
                .await?;
            if let Some(key) = generated {
                self.attributes.insert(key_name, key);
            }
            self.exists = true;
            debug!(model = %self.definition.name(), store = store.name(), "model created");
        }

        self.sync_original();
        Ok(())
    }

    /// Build, fill and save a new model.
    pub async fn create<S, K, V, I>(
        definition: Arc<ModelDefinition>,
        attributes: I,
        store: &S,
    ) -> Result<Model>
    where
        S: ModelStore + ?Sized,
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut model = Model::new(definition);
        model.fill(attributes)?;
        model.save(store).await?;
        Ok(model)
    }

    /// Load a stored model by key.
    pub async fn find<S>(
        definition: Arc<ModelDefinition>,
        store: &S,
        key: impl Into<Value>,
    ) -> Result<Option<Model>>
    where
        S: ModelStore + ?Sized,
    {
        let key = key.into();
        let record = store
            .find(definition.table(), definition.key_name(), &key)
            .await?;

        Ok(record.map(|attributes| {
            trace!(model = %definition.name(), %key, "model retrieved");
            Model::from_storage(definition, attributes)
        }))
    }
}
