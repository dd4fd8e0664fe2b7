use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tal_store::{load_document, store_document, DocumentStore};
use tal_types::Timestamp;
use tracing::{debug, error, info, warn};

use crate::error::{RegistryError, RegistryResult};

/// Document key under which revocations are persisted.
pub const REVOCATIONS_KEY: &str = "revocations";

/// Reason recorded when the caller gives none.
pub const DEFAULT_REASON: &str = "No reason provided";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRecord {
    pub token_hash: String,
    pub reason: String,
    pub revoked_at: Timestamp,
}

/// Insert-only set of revoked token fingerprints.
///
/// Once a hash is revoked it stays revoked, including across restarts:
/// records are never removed and a failed write never leaves a record
/// visible in memory only.
pub struct RevocationRegistry {
    store: Arc<dyn DocumentStore>,
    inner: RwLock<RevocationState>,
}

struct RevocationState {
    records: Vec<RevocationRecord>,
    by_hash: HashMap<String, usize>,
}

impl RevocationRegistry {
    pub fn open(store: Arc<dyn DocumentStore>) -> RegistryResult<Self> {
        let records: Vec<RevocationRecord> =
            load_document(store.as_ref(), REVOCATIONS_KEY)?.unwrap_or_default();
        let by_hash = records
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.token_hash.clone(), pos))
            .collect();
        info!(revocations = records.len(), "loaded revocation registry");
        Ok(Self {
            store,
            inner: RwLock::new(RevocationState { records, by_hash }),
        })
    }

    /// Revoke `token_hash`, failing with `AlreadyRevoked` if it already is.
    pub fn revoke(
        &self,
        token_hash: &str,
        reason: Option<&str>,
    ) -> RegistryResult<RevocationRecord> {
        if token_hash.is_empty() {
            return Err(RegistryError::InvalidPayload("tokenHash is required".into()));
        }
        let mut state = self.inner.write().map_err(|_| RegistryError::LockPoisoned)?;
        if state.by_hash.contains_key(token_hash) {
            warn!(token_hash, "token already revoked");
            return Err(RegistryError::AlreadyRevoked(token_hash.to_string()));
        }

        let record = RevocationRecord {
            token_hash: token_hash.to_string(),
            reason: reason
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_REASON)
                .to_string(),
            revoked_at: Timestamp::now(),
        };

        let pos = state.records.len();
        state.records.push(record.clone());
        state.by_hash.insert(record.token_hash.clone(), pos);
        if let Err(e) = store_document(self.store.as_ref(), REVOCATIONS_KEY, &state.records) {
            state.records.pop();
            state.by_hash.remove(token_hash);
            error!(token_hash, error = %e, "failed to persist revocations; revocation rolled back");
            return Err(e.into());
        }

        debug!(token_hash, reason = %record.reason, "revoked token");
        Ok(record)
    }

    pub fn is_revoked(&self, token_hash: &str) -> RegistryResult<bool> {
        let state = self.inner.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state.by_hash.contains_key(token_hash))
    }

    pub fn info(&self, token_hash: &str) -> RegistryResult<Option<RevocationRecord>> {
        let state = self.inner.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state
            .by_hash
            .get(token_hash)
            .and_then(|&pos| state.records.get(pos))
            .cloned())
    }

    /// All records in revocation order.
    pub fn all(&self) -> RegistryResult<Vec<RevocationRecord>> {
        let state = self.inner.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state.records.clone())
    }

    pub fn count(&self) -> RegistryResult<usize> {
        let state = self.inner.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tal_store::{FileDocumentStore, InMemoryDocumentStore, StoreError};

    fn registry() -> (Arc<InMemoryDocumentStore>, RevocationRegistry) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let registry = RevocationRegistry::open(store.clone()).unwrap();
        (store, registry)
    }

    #[test]
    fn revoke_records_reason() {
        let (_, registry) = registry();
        let record = registry.revoke("h1", Some("compromised")).unwrap();
        assert_eq!(record.token_hash, "h1");
        assert_eq!(record.reason, "compromised");
        assert!(registry.is_revoked("h1").unwrap());
        assert_eq!(registry.info("h1").unwrap(), Some(record));
        assert!(!registry.is_revoked("h2").unwrap());
        assert_eq!(registry.info("h2").unwrap(), None);
    }

    #[test]
    fn missing_reason_gets_default() {
        let (_, registry) = registry();
        assert_eq!(registry.revoke("a", None).unwrap().reason, DEFAULT_REASON);
        assert_eq!(registry.revoke("b", Some("")).unwrap().reason, DEFAULT_REASON);
    }

    #[test]
    fn second_revoke_is_rejected_and_keeps_original() {
        let (_, registry) = registry();
        let first = registry.revoke("h", Some("first")).unwrap();
        let err = registry.revoke("h", Some("second")).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyRevoked(h) if h == "h"));
        assert_eq!(registry.info("h").unwrap(), Some(first));
        assert_eq!(registry.count().unwrap(), 1);
    }

    #[test]
    fn racing_revokes_admit_exactly_one() {
        const THREADS: usize = 8;
        let (store, registry) = registry();
        let registry = Arc::new(registry);
        let barrier = Arc::new(std::sync::Barrier::new(THREADS));
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.revoke("h", Some(&format!("thread {t}")))
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(RegistryError::AlreadyRevoked(h)) if h == "h"))
            .count();
        assert_eq!(rejected, THREADS - 1);
        assert_eq!(registry.count().unwrap(), 1);

        let persisted: Vec<RevocationRecord> = load_document(&*store, REVOCATIONS_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(Some(&persisted[0]), registry.info("h").unwrap().as_ref());
    }

    #[test]
    fn empty_hash_is_invalid() {
        let (_, registry) = registry();
        assert!(matches!(
            registry.revoke("", None),
            Err(RegistryError::InvalidPayload(_))
        ));
    }

    #[test]
    fn failed_persist_rolls_back() {
        let (store, registry) = registry();
        store.set_read_only(true);
        let err = registry.revoke("h", None).unwrap_err();
        assert!(matches!(err, RegistryError::Store(StoreError::ReadOnly)));
        assert!(!registry.is_revoked("h").unwrap());

        store.set_read_only(false);
        assert!(registry.revoke("h", None).is_ok());
    }

    #[test]
    fn all_preserves_order() {
        let (_, registry) = registry();
        for h in ["c", "a", "b"] {
            registry.revoke(h, None).unwrap();
        }
        let hashes: Vec<_> = registry
            .all()
            .unwrap()
            .into_iter()
            .map(|r| r.token_hash)
            .collect();
        assert_eq!(hashes, vec!["c", "a", "b"]);
    }

    #[test]
    fn revocation_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Arc::new(FileDocumentStore::open(dir.path()).unwrap());
            let registry = RevocationRegistry::open(store).unwrap();
            registry.revoke("h", Some("lost device")).unwrap();
        }
        let store = Arc::new(FileDocumentStore::open(dir.path()).unwrap());
        let registry = RevocationRegistry::open(store).unwrap();
        assert!(registry.is_revoked("h").unwrap());
        assert_eq!(registry.info("h").unwrap().unwrap().reason, "lost device");
        assert!(matches!(
            registry.revoke("h", None),
            Err(RegistryError::AlreadyRevoked(_))
        ));
    }
}
