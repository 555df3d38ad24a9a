//! In-process key-value store.

use crate::Result;
use crate::storage::lock::acquire_lock;
use crate::storage::traits::KeyValueStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A [`KeyValueStore`] held in memory.
///
/// Clones share the same map, which lets tests hand one handle to an
/// adapter and keep another to inspect or corrupt the raw blob.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        acquire_lock(&self.items).len()
    }

    /// Returns true if no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        acquire_lock(&self.items).is_empty()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(acquire_lock(&self.items).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        acquire_lock(&self.items).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        acquire_lock(&self.items).remove(key);
        Ok(())
    }
}
