//! Everything a host model layer usually needs, in one import.
//!
//! ```
//! use modelschema::prelude::*;
//! ```

pub use crate::cast::{CastAs, CastContext, CastTo};
pub use crate::core::{CastType, ModelError, Result, Value};
pub use crate::model::{Model, ModelDefinition};
pub use crate::schema::{AttributeDef, Schema, SchemaEntry, SchemaRegistry};
pub use crate::store::{MemoryStore, ModelStore};
pub use crate::validation::{MessageBag, Validator};
pub use crate::register;
