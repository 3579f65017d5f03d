//! Host seam for the lifecycle hooks.
//!
//! The crate does not persist anything itself; [`Model::save`] and friends
//! hand rows to a [`ModelStore`] supplied by the host ORM.
//!
//! [`Model::save`]: crate::model::Model::save

mod memory;

pub use memory::MemoryStore;

use crate::core::{Result, Value};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// One stored row, attribute name to raw value.
pub type Record = BTreeMap<String, Value>;

#[async_trait]
pub trait ModelStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Insert a row. Returns the key the store generated, if it made one.
    async fn insert(
        &self,
        table: &str,
        key_name: &str,
        incrementing: bool,
        record: Record,
    ) -> Result<Option<Value>>;

    /// Apply changed attributes to the row identified by `key`.
    async fn update(&self, table: &str, key_name: &str, key: &Value, changes: Record) -> Result<()>;

    async fn find(&self, table: &str, key_name: &str, key: &Value) -> Result<Option<Record>>;
}
