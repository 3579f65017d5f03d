use super::{ModelStore, Record};
use crate::core::{ModelError, Result, Value};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Default)]
struct MemoryTable {
    rows: Vec<Record>,
    next_id: i64,
}

impl MemoryTable {
    fn position(&self, key_name: &str, key: &Value) -> Option<usize> {
        self.rows.iter().position(|row| row.get(key_name) == Some(key))
    }
}

/// In-memory [`ModelStore`] with auto-increment keys. Meant for tests and
/// tooling, not as a database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    /// Every row of `table` in insertion order.
    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModelStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn insert(
        &self,
        table: &str,
        key_name: &str,
        incrementing: bool,
        mut record: Record,
    ) -> Result<Option<Value>> {
        let mut tables = self.tables.write().await;
        let entries = tables.entry(table.to_string()).or_default();

        let mut generated = None;
        match record.get(key_name).cloned() {
            None | Some(Value::Null) if incrementing => {
                entries.next_id += 1;
                let key = Value::Integer(entries.next_id);
                record.insert(key_name.to_string(), key.clone());
                generated = Some(key);
            }
            Some(key) if !key.is_null() => {
                if entries.position(key_name, &key).is_some() {
                    return Err(ModelError::Store(format!(
                        "Duplicate key {} in table '{}'",
                        key, table
                    )));
                }
                if let Value::Integer(id) = key {
                    entries.next_id = entries.next_id.max(id);
                }
            }
            _ => {}
        }

        entries.rows.push(record);
        debug!(table, rows = entries.rows.len(), "row inserted");
        Ok(generated)
    }

    async fn update(
        &self,
        table: &str,
        key_name: &str,
        key: &Value,
        changes: Record,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let entries = tables
            .get_mut(table)
            .ok_or_else(|| ModelError::Store(format!("Table '{}' does not exist", table)))?;

        let idx = entries
            .position(key_name, key)
            .ok_or_else(|| {
                ModelError::Store(format!("No row with {} = {} in '{}'", key_name, key, table))
            })?;

        let columns = changes.len();
        entries.rows[idx].extend(changes);
        debug!(table, columns, "row updated");
        Ok(())
    }

    async fn find(&self, table: &str, key_name: &str, key: &Value) -> Result<Option<Record>> {
        let tables = self.tables.read().await;
        Ok(tables.get(table).and_then(|entries| {
            entries
                .position(key_name, key)
                .map(|idx| entries.rows[idx].clone())
        }))
    }
}
