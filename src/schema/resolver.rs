use super::{AttributeDef, EntryCache, EntryValue, Schema, SchemaEntry};
use crate::core::{ModelError, Result};
use std::sync::Arc;
use tracing::trace;

/// Per-instance schema: the class schema with instance overrides on top.
///
/// The merged schema and the per-entry name lists are cached; any override
/// change rebuilds the former and empties the latter.
#[derive(Debug, Clone)]
pub struct SchemaResolver {
    base: Arc<Schema>,
    overrides: Schema,
    resolved: Arc<Schema>,
    cache: EntryCache,
}

impl SchemaResolver {
    pub fn new(base: Arc<Schema>) -> Self {
        Self {
            resolved: Arc::clone(&base),
            base,
            overrides: Schema::new(),
            cache: EntryCache::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.resolved
    }

    pub fn base(&self) -> &Arc<Schema> {
        &self.base
    }

    pub fn overrides(&self) -> &Schema {
        &self.overrides
    }

    pub fn has_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }

    pub fn names_with(&self, entry: SchemaEntry) -> Result<Arc<Vec<String>>> {
        let schema = &self.resolved;
        self.cache.get_or_insert_with(entry, || schema.names_with(entry))
    }

    pub fn values_of(&self, entry: SchemaEntry) -> Vec<(String, EntryValue)> {
        self.resolved.values_of(entry)
    }

    /// Merge a partial definition into the overrides for `name`.
    pub fn override_attribute(&mut self, name: &str, def: AttributeDef) -> Result<()> {
        match self.overrides.get_mut(name) {
            Some(existing) => *existing = existing.merged(&def),
            None => self.overrides.insert(name, def),
        }
        self.resolve()
    }

    /// Set a flag entry on the listed attributes.
    ///
    /// With `reset_others` every other known attribute gets the flag cleared,
    /// which turns the list into the complete set. Names the schema does not
    /// know are ignored.
    pub fn update_structure<S: AsRef<str>>(
        &mut self,
        entry: SchemaEntry,
        names: &[S],
        reset_others: bool,
    ) -> Result<()> {
        if !entry.is_flag() {
            return Err(ModelError::InvalidSchema(format!(
                "Cannot update structure for value entry '{}'",
                entry
            )));
        }

        let listed: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
        for name in self.resolved.names() {
            let value = if listed.contains(&name.as_str()) {
                true
            } else if reset_others {
                false
            } else {
                continue;
            };

            let mut def = AttributeDef::new();
            def.set_flag(entry, value)?;
            match self.overrides.get_mut(&name) {
                Some(existing) => *existing = existing.merged(&def),
                None => self.overrides.insert(&name, def),
            }
        }

        trace!(entry = %entry, listed = ?listed, reset_others, "schema structure updated");
        self.resolve()
    }

    /// Drop every instance override.
    pub fn reset(&mut self) -> Result<()> {
        self.overrides = Schema::new();
        self.resolve()
    }

    fn resolve(&mut self) -> Result<()> {
        self.resolved = if self.overrides.is_empty() {
            Arc::clone(&self.base)
        } else {
            Arc::new(self.base.merge(&self.overrides))
        };
        self.cache.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> SchemaResolver {
        let schema = Schema::new()
            .with("id", AttributeDef::new().cast("integer").guarded())
            .with("name", AttributeDef::new().cast("string").fillable())
            .with("email", AttributeDef::new().cast("string"));
        SchemaResolver::new(Arc::new(schema))
    }

    #[test]
    fn test_without_overrides_shares_base() {
        let resolver = resolver();
        assert!(Arc::ptr_eq(resolver.schema(), resolver.base()));
    }

    #[test]
    fn test_update_structure_replaces_set() {
        let mut resolver = resolver();
        resolver
            .update_structure(SchemaEntry::Fillable, &["email"], true)
            .unwrap();

        assert_eq!(*resolver.names_with(SchemaEntry::Fillable).unwrap(), vec!["email"]);
        assert_eq!(resolver.base().names_with(SchemaEntry::Fillable), vec!["name"]);
    }

    #[test]
    fn test_update_structure_additive() {
        let mut resolver = resolver();
        resolver
            .update_structure(SchemaEntry::Hidden, &["name", "unknown"], false)
            .unwrap();
        resolver
            .update_structure(SchemaEntry::Hidden, &["email"], false)
            .unwrap();

        assert_eq!(*resolver.names_with(SchemaEntry::Hidden).unwrap(), vec!["name", "email"]);
    }

    #[test]
    fn test_cache_invalidated_on_override() {
        let mut resolver = resolver();
        assert_eq!(*resolver.names_with(SchemaEntry::Hidden).unwrap(), Vec::<String>::new());

        resolver
            .override_attribute("id", AttributeDef::new().hidden())
            .unwrap();
        assert_eq!(*resolver.names_with(SchemaEntry::Hidden).unwrap(), vec!["id"]);

        resolver.reset().unwrap();
        assert!(resolver.names_with(SchemaEntry::Hidden).unwrap().is_empty());
    }

    #[test]
    fn test_value_entries_rejected() {
        let mut resolver = resolver();
        assert!(resolver.update_structure(SchemaEntry::Rules, &["id"], true).is_err());
    }
}
