use super::SchemaEntry;
use crate::core::Result;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const ENTRY_CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::new(SchemaEntry::ALL.len()).unwrap();

/// Memoized attribute-name lists, one per schema entry.
pub struct EntryCache {
    lists: Mutex<LruCache<SchemaEntry, Arc<Vec<String>>>>,
}

impl EntryCache {
    pub fn new() -> Self {
        Self {
            lists: Mutex::new(LruCache::new(ENTRY_CACHE_CAPACITY)),
        }
    }

    pub fn get_or_insert_with(
        &self,
        entry: SchemaEntry,
        compute: impl FnOnce() -> Vec<String>,
    ) -> Result<Arc<Vec<String>>> {
        let mut lists = self.lists.lock()?;
        if let Some(cached) = lists.get(&entry) {
            return Ok(Arc::clone(cached));
        }
        let computed = Arc::new(compute());
        lists.put(entry, Arc::clone(&computed));
        Ok(computed)
    }

    pub fn clear(&self) -> Result<()> {
        self.lists.lock()?.clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lists.lock().map(|lists| lists.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EntryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EntryCache {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EntryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryCache").field("len", &self.len()).finish()
    }
}
