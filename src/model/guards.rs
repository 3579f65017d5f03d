use super::Model;
use super::attributes::base_key;
use crate::core::{ModelError, Result, Value};
use crate::schema::SchemaEntry;
use tracing::debug;

impl Model {
    pub fn get_fillable(&self) -> Result<Vec<String>> {
        Ok(self.schema.names_with(SchemaEntry::Fillable)?.to_vec())
    }

    /// Replace the fillable set for this instance.
    pub fn fillable<S: AsRef<str>>(&mut self, fillable: &[S]) -> Result<&mut Self> {
        self.schema.update_structure(SchemaEntry::Fillable, fillable, true)?;
        Ok(self)
    }

    /// Guarded attributes for the model's current state: `guarded-create`
    /// while new, `guarded-update` once stored, then plain `guarded`.
    pub fn get_guarded(&self) -> Result<Vec<String>> {
        let state_entry = if self.exists {
            SchemaEntry::GuardedUpdate
        } else {
            SchemaEntry::GuardedCreate
        };

        let mut guarded = self.schema.names_with(state_entry)?.to_vec();
        for name in self.schema.names_with(SchemaEntry::Guarded)?.iter() {
            if !guarded.contains(name) {
                guarded.push(name.clone());
            }
        }
        Ok(guarded)
    }

    /// Replace the guarded set for this instance.
    pub fn guard<S: AsRef<str>>(&mut self, guarded: &[S]) -> Result<&mut Self> {
        self.schema.update_structure(SchemaEntry::Guarded, guarded, true)?;
        Ok(self)
    }

    pub fn is_guarded(&self, key: &str) -> Result<bool> {
        let key = base_key(key);
        Ok(self.get_guarded()?.iter().any(|guarded| guarded == key))
    }

    /// Whether mass assignment may set `key`.
    ///
    /// Without an explicit fillable list every unguarded attribute is
    /// fillable, except names starting with `_`.
    pub fn is_fillable(&self, key: &str) -> Result<bool> {
        if self.definition.is_unguarded() {
            return Ok(true);
        }

        let base = base_key(key);
        let fillable = self.get_fillable()?;
        if fillable.iter().any(|name| name == base) {
            return Ok(true);
        }

        if self.is_guarded(base)? {
            return Ok(false);
        }

        Ok(fillable.is_empty() && !key.starts_with('_'))
    }

    /// No fillable attributes and every attribute guarded.
    pub fn totally_guarded(&self) -> Result<bool> {
        if !self.get_fillable()?.is_empty() {
            return Ok(false);
        }

        let guarded = self.get_guarded()?;
        Ok(self
            .valid_attributes()
            .iter()
            .all(|name| guarded.contains(name)))
    }

    /// Mass assignment.
    ///
    /// Fillable keys are written through [`Model::set_attribute`]; keys the
    /// schema does not know or that are not fillable are skipped. A totally
    /// guarded model rejects the first non-fillable key instead.
    pub fn fill<K, V, I>(&mut self, attributes: I) -> Result<&mut Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let totally_guarded = self.totally_guarded()?;

        for (key, value) in attributes {
            let key = key.as_ref();
            if !self.is_valid_attribute(key) {
                debug!(model = %self.definition.name(), key, "unknown attribute skipped on fill");
                continue;
            }

            if self.is_fillable(key)? {
                self.set_attribute(key, value)?;
            } else if totally_guarded {
                return Err(ModelError::MassAssignment(
                    key.to_string(),
                    self.definition.name().to_string(),
                ));
            } else {
                debug!(
                    model = %self.definition.name(),
                    key,
                    "non-fillable attribute skipped on fill"
                );
            }
        }

        Ok(self)
    }
}
