use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tal_store::{load_document, store_document, DocumentStore};
use tracing::{debug, error, info};

use crate::error::{RegistryError, RegistryResult};

/// Document key under which public keys are persisted.
pub const PUBLIC_KEYS_KEY: &str = "public-keys";

/// Current public key per user. Registration overwrites; no history is kept
/// here.
pub struct PublicKeyDirectory {
    store: Arc<dyn DocumentStore>,
    keys: RwLock<BTreeMap<String, String>>,
}

impl PublicKeyDirectory {
    pub fn open(store: Arc<dyn DocumentStore>) -> RegistryResult<Self> {
        let keys: BTreeMap<String, String> =
            load_document(store.as_ref(), PUBLIC_KEYS_KEY)?.unwrap_or_default();
        info!(keys = keys.len(), "loaded public key directory");
        Ok(Self {
            store,
            keys: RwLock::new(keys),
        })
    }

    /// Set `user_id`'s key, replacing any previous one.
    pub fn register(&self, user_id: &str, public_key: &str) -> RegistryResult<()> {
        if user_id.is_empty() || public_key.is_empty() {
            return Err(RegistryError::InvalidPayload(
                "userId and publicKey are required".into(),
            ));
        }
        let mut keys = self.keys.write().map_err(|_| RegistryError::LockPoisoned)?;
        let previous = keys.insert(user_id.to_string(), public_key.to_string());
        if let Err(e) = store_document(self.store.as_ref(), PUBLIC_KEYS_KEY, &*keys) {
            match previous {
                Some(old) => keys.insert(user_id.to_string(), old),
                None => keys.remove(user_id),
            };
            error!(user_id, error = %e, "failed to persist public keys; registration rolled back");
            return Err(e.into());
        }
        debug!(user_id, replaced = previous.is_some(), "registered public key");
        Ok(())
    }

    pub fn get(&self, user_id: &str) -> RegistryResult<Option<String>> {
        let keys = self.keys.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(keys.get(user_id).cloned())
    }

    pub fn all(&self) -> RegistryResult<BTreeMap<String, String>> {
        let keys = self.keys.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(keys.clone())
    }

    pub fn count(&self) -> RegistryResult<usize> {
        let keys = self.keys.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(keys.len())
    }
}
