use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::traits::{validate_key, DocumentStore};

/// In-memory, HashMap-based document store.
///
/// Intended for tests and embedding. Writes can be switched off with
/// [`InMemoryDocumentStore::set_read_only`] to exercise persistence failures.
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Value>>,
    read_only: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            read_only: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `store` fail with [`StoreError::ReadOnly`].
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Number of documents held.
    pub fn len(&self) -> usize {
        self.documents.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn load(&self, key: &str) -> StoreResult<Option<Value>> {
        validate_key(key)?;
        let docs = self.documents.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(docs.get(key).cloned())
    }

    fn store(&self, key: &str, value: &Value) -> StoreResult<()> {
        validate_key(key)?;
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        let mut docs = self.documents.write().map_err(|_| StoreError::LockPoisoned)?;
        docs.insert(key.to_string(), value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn store_and_load() {
        let store = InMemoryDocumentStore::new();
        assert!(store.is_empty());
        store.store("chain", &json!([1, 2, 3])).unwrap();
        assert_eq!(store.load("chain").unwrap(), Some(json!([1, 2, 3])));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn store_replaces_whole_document() {
        let store = InMemoryDocumentStore::new();
        store.store("certificates", &json!([{"id": "a"}])).unwrap();
        store.store("certificates", &json!([])).unwrap();
        assert_eq!(store.load("certificates").unwrap(), Some(json!([])));
    }

    #[test]
    fn read_only_rejects_writes_and_keeps_previous() {
        let store = InMemoryDocumentStore::new();
        store.store("revocations", &json!({"x": 1})).unwrap();
        store.set_read_only(true);
        let err = store.store("revocations", &json!({})).unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly));
        assert_eq!(store.load("revocations").unwrap(), Some(json!({"x": 1})));

        store.set_read_only(false);
        store.store("revocations", &json!({})).unwrap();
        assert_eq!(store.load("revocations").unwrap(), Some(json!({})));
    }

    #[test]
    fn invalid_key_rejected() {
        let store = InMemoryDocumentStore::new();
        assert!(matches!(
            store.store("a/b", &json!(null)),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.load(""), Err(StoreError::InvalidKey(_))));
    }
}
