// ============================================================================
// modelschema Library
// ============================================================================

pub mod cast;
pub mod core;
pub mod model;
pub mod prelude;
pub mod schema;
pub mod store;
pub mod validation;

// Re-export main types for convenience
pub use crate::core::{CastType, ModelError, Result, Value};
pub use model::{AuthCheck, Model, ModelDefinition, ModelDefinitionBuilder, SetMutator};
pub use schema::{AttributeDef, Schema, SchemaEntry, SchemaRegistry, SchemaResolver};
pub use store::{MemoryStore, ModelStore, Record};
pub use validation::{MessageBag, Validator};

// ============================================================================
// Registration helpers
// ============================================================================

use std::sync::Arc;

/// Build a definition and register it in the global registry.
///
/// # Examples
///
/// ```
/// use modelschema::{AttributeDef, Model, ModelDefinition, Schema, register};
///
/// # fn main() -> modelschema::Result<()> {
/// register(
///     ModelDefinition::builder("doc_user").schema(
///         Schema::new()
///             .with("id", AttributeDef::new().cast("integer").guarded())
///             .with("name", AttributeDef::new().cast("string").fillable()),
///     ),
/// )?;
///
/// let mut user = Model::named("doc_user")?;
/// assert!(user.set("name", "Ada")?);
/// assert!(!user.set("id", 4)?);
/// # Ok(())
/// # }
/// ```
pub fn register(builder: ModelDefinitionBuilder) -> Result<Arc<ModelDefinition>> {
    SchemaRegistry::global().register(builder.build()?)
}
