use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Keyed document store.
///
/// All implementations must satisfy these invariants:
/// - `store` replaces the whole document for a key and is durable once it
///   returns `Ok`.
/// - A failed `store` leaves the previous document intact.
/// - `load` returns `Ok(None)` only when no document exists for the key.
pub trait DocumentStore: Send + Sync {
    /// Load the document stored under `key`.
    fn load(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Durably replace the document stored under `key`.
    fn store(&self, key: &str, value: &Value) -> StoreResult<()>;
}

/// Load and decode a typed document.
pub fn load_document<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    key: &str,
) -> StoreResult<Option<T>> {
    let Some(value) = store.load(key)? else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| StoreError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// Encode and durably store a typed document.
pub fn store_document<T: Serialize + ?Sized>(
    store: &dyn DocumentStore,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let value = serde_json::to_value(value).map_err(|e| StoreError::Serialization {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    store.store(key, &value)
}

/// Document keys double as file names, so only a conservative alphabet is
/// accepted.
pub fn validate_key(key: &str) -> StoreResult<()> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
