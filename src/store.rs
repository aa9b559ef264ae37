//! Keyed storage for documents and modification lists
//!
//! Front ends that juggle several documents at once keep them in a store
//! they own and inject; the processing core itself holds no global state.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

/// Generate a fresh document identifier.
pub fn new_document_id() -> String {
    Uuid::new_v4().to_string()
}

pub trait DocumentStore<V>: Send + Sync {
    fn get(&self, id: &str) -> Option<V>;

    /// Insert or replace; returns the previous value.
    fn put(&self, id: &str, value: V) -> Option<V>;

    fn delete(&self, id: &str) -> Option<V>;

    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store backed by a read/write locked map. Operations on one
/// id are not serialized beyond single calls; callers coordinate edits.
#[derive(Debug)]
pub struct MemoryStore<V> {
    entries: RwLock<HashMap<String, V>>,
}

impl<V> Default for MemoryStore<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> MemoryStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

impl<V: Clone + Send + Sync> DocumentStore<V> for MemoryStore<V> {
    fn get(&self, id: &str) -> Option<V> {
        self.entries.read().get(id).cloned()
    }

    fn put(&self, id: &str, value: V) -> Option<V> {
        self.entries.write().insert(id.to_string(), value)
    }

    fn delete(&self, id: &str) -> Option<V> {
        self.entries.write().remove(id)
    }

    fn clear(&self) {
        self.entries.write().clear();
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}
