use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tal_crypto::{canonicalize, verify_signature, CanonicalError, ContentHasher};
use tal_store::{load_document, store_document, DocumentStore};
use tal_types::Timestamp;
use tracing::{debug, error, info, warn};

use crate::error::{RegistryError, RegistryResult};

/// Document key under which certificates are persisted.
pub const CERTIFICATES_KEY: &str = "certificates";

/// The signed claim of a certificate.
///
/// Its canonical serialization (see [`CertificatePayload::canonical_bytes`])
/// is the exact message the issuer signs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificatePayload {
    pub issuer_user_id: String,
    pub credential_id: String,
    pub token_hash: String,
    pub expiry: Timestamp,
    pub ledger_block_hash: String,
}

impl CertificatePayload {
    /// Compact JSON with keys sorted bytewise and `expiry` as an integer.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, CanonicalError> {
        canonicalize(self)
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now.is_after(&self.expiry)
    }
}

/// A payload as submitted by a client, before required members are checked.
///
/// Empty strings count as absent. Members outside the five payload fields
/// are dropped on deserialization.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadDraft {
    pub issuer_user_id: Option<String>,
    pub credential_id: Option<String>,
    pub token_hash: Option<String>,
    pub expiry: Option<Timestamp>,
    pub ledger_block_hash: Option<String>,
}

impl PayloadDraft {
    /// Promote to a complete payload, naming every missing member on failure.
    pub fn into_payload(self) -> RegistryResult<CertificatePayload> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|s| !s.is_empty())
        }

        let issuer_user_id = present(self.issuer_user_id);
        let credential_id = present(self.credential_id);
        let token_hash = present(self.token_hash);
        let ledger_block_hash = present(self.ledger_block_hash);

        let missing: Vec<&str> = [
            ("issuerUserId", issuer_user_id.is_none()),
            ("credentialId", credential_id.is_none()),
            ("tokenHash", token_hash.is_none()),
            ("expiry", self.expiry.is_none()),
            ("ledgerBlockHash", ledger_block_hash.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        match (
            issuer_user_id,
            credential_id,
            token_hash,
            self.expiry,
            ledger_block_hash,
        ) {
            (
                Some(issuer_user_id),
                Some(credential_id),
                Some(token_hash),
                Some(expiry),
                Some(ledger_block_hash),
            ) => Ok(CertificatePayload {
                issuer_user_id,
                credential_id,
                token_hash,
                expiry,
                ledger_block_hash,
            }),
            _ => Err(RegistryError::InvalidPayload(format!(
                "missing required payload fields: {}",
                missing.join(", ")
            ))),
        }
    }
}

impl From<CertificatePayload> for PayloadDraft {
    fn from(p: CertificatePayload) -> Self {
        Self {
            issuer_user_id: Some(p.issuer_user_id),
            credential_id: Some(p.credential_id),
            token_hash: Some(p.token_hash),
            expiry: Some(p.expiry),
            ledger_block_hash: Some(p.ledger_block_hash),
        }
    }
}

/// A registered certificate. Immutable once stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub certificate_id: String,
    pub payload: CertificatePayload,
    /// Hex Ed25519 signature over the canonical payload.
    pub signature: String,
    /// Hex Ed25519 verifying key of the issuer.
    pub issuer_public_key: String,
    pub created_at: Timestamp,
}

impl Certificate {
    /// Re-verify the signature against the inline issuer key.
    pub fn signature_is_valid(&self) -> bool {
        signature_matches(&self.payload, &self.signature, &self.issuer_public_key)
    }
}

fn signature_matches(payload: &CertificatePayload, signature: &str, public_key: &str) -> bool {
    match payload.canonical_bytes() {
        Ok(message) => verify_signature(public_key, &message, signature),
        Err(_) => false,
    }
}

/// Outcome of certificate-local verification.
///
/// Checks run in this order and stop at the first failure: existence,
/// expiry, token fingerprint, signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CertificateVerification {
    Valid(Box<Certificate>),
    NotFound,
    Expired,
    TokenMismatch,
    InvalidSignature,
}

impl CertificateVerification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// User-facing reason for a negative outcome.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Valid(_) => None,
            Self::NotFound => Some("Certificate not found"),
            Self::Expired => Some("Certificate expired"),
            Self::TokenMismatch => Some("Token hash mismatch"),
            Self::InvalidSignature => Some("Invalid signature"),
        }
    }
}

/// Aggregate counts over all certificates at the current time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
}

/// Insert-only certificate store.
///
/// The registry does not check that `ledgerBlockHash` names an existing
/// block, nor does its [`verify`](Self::verify) consult revocations or the
/// chain. Callers that need those guarantees must perform them.
pub struct CertificateRegistry {
    store: Arc<dyn DocumentStore>,
    inner: RwLock<CertificateState>,
}

struct CertificateState {
    certificates: Vec<Certificate>,
    by_id: HashMap<String, usize>,
}

impl CertificateRegistry {
    pub fn open(store: Arc<dyn DocumentStore>) -> RegistryResult<Self> {
        let certificates: Vec<Certificate> =
            load_document(store.as_ref(), CERTIFICATES_KEY)?.unwrap_or_default();
        let by_id = certificates
            .iter()
            .enumerate()
            .map(|(pos, c)| (c.certificate_id.clone(), pos))
            .collect();
        info!(certificates = certificates.len(), "loaded certificate registry");
        Ok(Self {
            store,
            inner: RwLock::new(CertificateState {
                certificates,
                by_id,
            }),
        })
    }

    /// Register a new certificate.
    ///
    /// Fails with `Conflict` for a known id, then `InvalidPayload` for
    /// missing members, then `InvalidSignature` if the signature does not
    /// verify over the canonical payload under `issuer_public_key`.
    pub fn register(
        &self,
        certificate_id: &str,
        draft: PayloadDraft,
        signature: &str,
        issuer_public_key: &str,
    ) -> RegistryResult<Certificate> {
        let mut state = self.inner.write().map_err(|_| RegistryError::LockPoisoned)?;

        if state.by_id.contains_key(certificate_id) {
            warn!(certificate_id, "rejected duplicate certificate");
            return Err(RegistryError::Conflict(certificate_id.to_string()));
        }
        if certificate_id.is_empty() {
            return Err(RegistryError::InvalidPayload("certificateId is required".into()));
        }
        let payload = draft.into_payload()?;
        if !signature_matches(&payload, signature, issuer_public_key) {
            warn!(certificate_id, "rejected certificate with invalid signature");
            return Err(RegistryError::InvalidSignature);
        }

        let certificate = Certificate {
            certificate_id: certificate_id.to_string(),
            payload,
            signature: signature.to_string(),
            issuer_public_key: issuer_public_key.to_string(),
            created_at: Timestamp::now(),
        };

        let pos = state.certificates.len();
        state.certificates.push(certificate.clone());
        state.by_id.insert(certificate.certificate_id.clone(), pos);
        if let Err(e) = store_document(self.store.as_ref(), CERTIFICATES_KEY, &state.certificates) {
            state.certificates.pop();
            state.by_id.remove(certificate_id);
            error!(
                certificate_id,
                error = %e,
                "failed to persist certificates; registration rolled back"
            );
            return Err(e.into());
        }

        debug!(
            certificate_id,
            issuer = %certificate.payload.issuer_user_id,
            "registered certificate"
        );
        Ok(certificate)
    }

    pub fn get(&self, certificate_id: &str) -> RegistryResult<Option<Certificate>> {
        let state = self.inner.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state
            .by_id
            .get(certificate_id)
            .and_then(|&pos| state.certificates.get(pos))
            .cloned())
    }

    /// All certificates in registration order.
    pub fn all(&self) -> RegistryResult<Vec<Certificate>> {
        let state = self.inner.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state.certificates.clone())
    }

    pub fn by_issuer(&self, issuer_user_id: &str) -> RegistryResult<Vec<Certificate>> {
        let state = self.inner.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state
            .certificates
            .iter()
            .filter(|c| c.payload.issuer_user_id == issuer_user_id)
            .cloned()
            .collect())
    }

    /// Verify `token` against the certificate as of now.
    pub fn verify(
        &self,
        certificate_id: &str,
        token: &str,
    ) -> RegistryResult<CertificateVerification> {
        self.verify_at(certificate_id, token, Timestamp::now())
    }

    /// Verify `token` against the certificate as of `now`.
    pub fn verify_at(
        &self,
        certificate_id: &str,
        token: &str,
        now: Timestamp,
    ) -> RegistryResult<CertificateVerification> {
        let Some(certificate) = self.get(certificate_id)? else {
            return Ok(CertificateVerification::NotFound);
        };
        let verdict = if certificate.payload.is_expired_at(now) {
            CertificateVerification::Expired
        } else if !ContentHasher::verify_hex(token.as_bytes(), &certificate.payload.token_hash) {
            CertificateVerification::TokenMismatch
        } else if !certificate.signature_is_valid() {
            CertificateVerification::InvalidSignature
        } else {
            CertificateVerification::Valid(Box::new(certificate))
        };
        if let Some(reason) = verdict.reason() {
            debug!(certificate_id, reason, "certificate failed verification");
        }
        Ok(verdict)
    }

    pub fn stats(&self) -> RegistryResult<CertificateStats> {
        let now = Timestamp::now();
        let state = self.inner.read().map_err(|_| RegistryError::LockPoisoned)?;
        let expired = state
            .certificates
            .iter()
            .filter(|c| c.payload.is_expired_at(now))
            .count();
        Ok(CertificateStats {
            total: state.certificates.len(),
            active: state.certificates.len() - expired,
            expired,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tal_crypto::SigningKey;
    use tal_store::{FileDocumentStore, InMemoryDocumentStore, StoreError};

    const TOKEN: &str = "correct-token";
    const HOUR: u64 = 3_600_000;

    fn payload(issuer: &str, expiry: Timestamp) -> CertificatePayload {
        CertificatePayload {
            issuer_user_id: issuer.into(),
            credential_id: "cred-1".into(),
            token_hash: ContentHasher::hash_hex(TOKEN.as_bytes()),
            expiry,
            ledger_block_hash: "ab".repeat(32),
        }
    }

    fn sign(key: &SigningKey, payload: &CertificatePayload) -> String {
        key.sign(&payload.canonical_bytes().unwrap()).to_hex()
    }

    fn registry() -> (Arc<InMemoryDocumentStore>, CertificateRegistry) {
        let store = Arc::new(InMemoryDocumentStore::new());
        let registry = CertificateRegistry::open(store.clone()).unwrap();
        (store, registry)
    }

    fn register_valid(
        registry: &CertificateRegistry,
        id: &str,
        issuer: &str,
        expiry: Timestamp,
    ) -> RegistryResult<Certificate> {
        let key = SigningKey::generate();
        let p = payload(issuer, expiry);
        let sig = sign(&key, &p);
        registry.register(id, p.into(), &sig, &key.verifying_key().to_hex())
    }

    #[test]
    fn canonical_bytes_are_sorted_and_compact() {
        let p = CertificatePayload {
            issuer_user_id: "u".into(),
            credential_id: "c".into(),
            token_hash: "t".into(),
            expiry: Timestamp::from_millis(5),
            ledger_block_hash: "h".into(),
        };
        assert_eq!(
            String::from_utf8(p.canonical_bytes().unwrap()).unwrap(),
            r#"{"credentialId":"c","expiry":5,"issuerUserId":"u","ledgerBlockHash":"h","tokenHash":"t"}"#
        );
    }

    #[test]
    fn draft_reports_every_missing_field() {
        let draft = PayloadDraft {
            issuer_user_id: Some("u".into()),
            credential_id: Some(String::new()),
            ..Default::default()
        };
        let err = draft.into_payload().unwrap_err();
        let RegistryError::InvalidPayload(msg) = err else {
            panic!("expected InvalidPayload");
        };
        assert_eq!(
            msg,
            "missing required payload fields: credentialId, tokenHash, expiry, ledgerBlockHash"
        );
    }

    #[test]
    fn draft_ignores_unknown_members() {
        let draft: PayloadDraft = serde_json::from_value(serde_json::json!({
            "issuerUserId": "u",
            "credentialId": "c",
            "tokenHash": "t",
            "expiry": 9,
            "ledgerBlockHash": "h",
            "extra": true
        }))
        .unwrap();
        assert!(draft.into_payload().is_ok());
    }

    #[test]
    fn scenario_register_and_verify_tokens() {
        let (_, registry) = registry();
        let expiry = Timestamp::now().plus_millis(HOUR);
        let cert = register_valid(&registry, "cert-1", "issuer-a", expiry).unwrap();
        assert_eq!(registry.get("cert-1").unwrap(), Some(cert.clone()));

        let ok = registry.verify("cert-1", TOKEN).unwrap();
        assert_eq!(ok, CertificateVerification::Valid(Box::new(cert)));
        assert!(ok.is_valid());

        let wrong = registry.verify("cert-1", "wrong-token").unwrap();
        assert_eq!(wrong, CertificateVerification::TokenMismatch);
        assert_eq!(wrong.reason(), Some("Token hash mismatch"));
    }

    #[test]
    fn scenario_expired_certificate() {
        let (_, registry) = registry();
        let past = Timestamp::from_millis(Timestamp::now().as_millis() - HOUR);
        register_valid(&registry, "old", "issuer-a", past).unwrap();

        for token in [TOKEN, "wrong-token"] {
            let verdict = registry.verify("old", token).unwrap();
            assert_eq!(verdict, CertificateVerification::Expired);
            assert_eq!(verdict.reason(), Some("Certificate expired"));
        }
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let (_, registry) = registry();
        let expiry = Timestamp::from_millis(10_000);
        register_valid(&registry, "c", "i", expiry).unwrap();
        assert!(registry.verify_at("c", TOKEN, expiry).unwrap().is_valid());
        assert_eq!(
            registry.verify_at("c", TOKEN, expiry.plus_millis(1)).unwrap(),
            CertificateVerification::Expired
        );
    }

    #[test]
    fn unknown_certificate_is_not_found() {
        let (_, registry) = registry();
        let verdict = registry.verify("missing", TOKEN).unwrap();
        assert_eq!(verdict, CertificateVerification::NotFound);
        assert_eq!(verdict.reason(), Some("Certificate not found"));
    }

    #[test]
    fn duplicate_id_conflicts_regardless_of_payload() {
        let (_, registry) = registry();
        let expiry = Timestamp::now().plus_millis(HOUR);
        register_valid(&registry, "dup", "issuer-a", expiry).unwrap();
        let err = register_valid(&registry, "dup", "issuer-b", expiry).unwrap_err();
        assert!(matches!(err, RegistryError::Conflict(id) if id == "dup"));

        let err = registry
            .register("dup", PayloadDraft::default(), "", "")
            .unwrap_err();
        assert!(matches!(err, RegistryError::Conflict(_)));
        assert_eq!(registry.all().unwrap().len(), 1);
    }

    #[test]
    fn racing_registrations_admit_exactly_one() {
        const THREADS: usize = 8;
        let (store, registry) = registry();
        let registry = Arc::new(registry);
        let barrier = Arc::new(std::sync::Barrier::new(THREADS));
        let expiry = Timestamp::now().plus_millis(HOUR);
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    let issuer = format!("issuer-{t}");
                    barrier.wait();
                    register_valid(&registry, "contested", &issuer, expiry)
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(RegistryError::Conflict(id)) if id == "contested"))
            .count();
        assert_eq!(conflicts, THREADS - 1);

        let winner = results.into_iter().find_map(Result::ok).unwrap();
        let persisted: Vec<Certificate> = load_document(&*store, CERTIFICATES_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(persisted, vec![winner.clone()]);
        assert_eq!(registry.get("contested").unwrap(), Some(winner));
    }

    #[test]
    fn uppercase_token_hash_does_not_match() {
        let (_, registry) = registry();
        let key = SigningKey::generate();
        let mut p = payload("issuer-a", Timestamp::now().plus_millis(HOUR));
        p.token_hash = p.token_hash.to_uppercase();
        let sig = sign(&key, &p);
        registry
            .register("upper", p.into(), &sig, &key.verifying_key().to_hex())
            .unwrap();
        assert_eq!(
            registry.verify("upper", TOKEN).unwrap(),
            CertificateVerification::TokenMismatch
        );
    }

    #[test]
    fn missing_fields_are_invalid_payload() {
        let (_, registry) = registry();
        let err = registry
            .register("c", PayloadDraft::default(), "00", "00")
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPayload(_)));
        assert!(registry.all().unwrap().is_empty());
    }

    #[test]
    fn bad_signature_is_rejected() {
        let (_, registry) = registry();
        let key = SigningKey::generate();
        let other = SigningKey::generate();
        let p = payload("issuer-a", Timestamp::now().plus_millis(HOUR));
        let sig = sign(&key, &p);

        let err = registry
            .register("c", p.clone().into(), &sig, &other.verifying_key().to_hex())
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSignature));

        let err = registry
            .register("c", p.into(), "not-hex", &key.verifying_key().to_hex())
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSignature));
        assert!(registry.get("c").unwrap().is_none());
    }

    #[test]
    fn stored_signature_is_reverified() {
        let store = Arc::new(InMemoryDocumentStore::new());
        {
            let registry = CertificateRegistry::open(store.clone()).unwrap();
            register_valid(&registry, "c", "i", Timestamp::now().plus_millis(HOUR)).unwrap();
        }
        let mut certs: Vec<Certificate> =
            load_document(&*store, CERTIFICATES_KEY).unwrap().unwrap();
        certs[0].payload.credential_id = "forged".into();
        store_document(&*store, CERTIFICATES_KEY, &certs).unwrap();

        let registry = CertificateRegistry::open(store).unwrap();
        assert_eq!(
            registry.verify("c", TOKEN).unwrap(),
            CertificateVerification::InvalidSignature
        );
    }

    #[test]
    fn by_issuer_preserves_order() {
        let (_, registry) = registry();
        let expiry = Timestamp::now().plus_millis(HOUR);
        for (id, issuer) in [("1", "a"), ("2", "b"), ("3", "a"), ("4", "a")] {
            register_valid(&registry, id, issuer, expiry).unwrap();
        }
        let ids: Vec<_> = registry
            .by_issuer("a")
            .unwrap()
            .into_iter()
            .map(|c| c.certificate_id)
            .collect();
        assert_eq!(ids, vec!["1", "3", "4"]);
        assert!(registry.by_issuer("nobody").unwrap().is_empty());
    }

    #[test]
    fn stats_split_active_and_expired() {
        let (_, registry) = registry();
        let now = Timestamp::now();
        register_valid(&registry, "live", "i", now.plus_millis(HOUR)).unwrap();
        register_valid(&registry, "dead", "i", Timestamp::from_millis(1)).unwrap();
        assert_eq!(
            registry.stats().unwrap(),
            CertificateStats {
                total: 2,
                active: 1,
                expired: 1
            }
        );
    }

    #[test]
    fn failed_persist_rolls_back() {
        let (store, registry) = registry();
        store.set_read_only(true);
        let err = register_valid(&registry, "c", "i", Timestamp::now().plus_millis(HOUR))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Store(StoreError::ReadOnly)));
        assert!(registry.get("c").unwrap().is_none());

        store.set_read_only(false);
        assert!(register_valid(&registry, "c", "i", Timestamp::now().plus_millis(HOUR)).is_ok());
    }

    #[test]
    fn restart_preserves_certificates_and_verdicts() {
        let dir = tempfile::tempdir().unwrap();
        let expiry = Timestamp::now().plus_millis(HOUR);
        let cert = {
            let store = Arc::new(FileDocumentStore::open(dir.path()).unwrap());
            let registry = CertificateRegistry::open(store).unwrap();
            register_valid(&registry, "c", "i", expiry).unwrap()
        };
        let store = Arc::new(FileDocumentStore::open(dir.path()).unwrap());
        let registry = CertificateRegistry::open(store).unwrap();
        assert_eq!(registry.get("c").unwrap(), Some(cert));
        assert!(registry.verify("c", TOKEN).unwrap().is_valid());
        assert!(matches!(
            register_valid(&registry, "c", "i", expiry),
            Err(RegistryError::Conflict(_))
        ));
    }

    proptest! {
        #[test]
        fn valid_iff_unexpired_matching_and_signed(
            expired in any::<bool>(),
            token_matches in any::<bool>(),
            signed_by_issuer in any::<bool>(),
        ) {
            let key = SigningKey::generate();
            let expiry = Timestamp::from_millis(1_000_000);
            let now = if expired { expiry.plus_millis(1) } else { expiry };
            let p = payload("issuer", expiry);
            let sig = sign(&key, &p);

            let store = Arc::new(InMemoryDocumentStore::new());
            let registry = CertificateRegistry::open(store.clone()).unwrap();
            registry.register("c", p.into(), &sig, &key.verifying_key().to_hex()).unwrap();

            if !signed_by_issuer {
                let mut certs: Vec<Certificate> =
                    load_document(&*store, CERTIFICATES_KEY).unwrap().unwrap();
                certs[0].issuer_public_key = SigningKey::generate().verifying_key().to_hex();
                store_document(&*store, CERTIFICATES_KEY, &certs).unwrap();
            }
            let registry = CertificateRegistry::open(store).unwrap();

            let token = if token_matches { TOKEN } else { "other" };
            let verdict = registry.verify_at("c", token, now).unwrap();
            let expected = if expired {
                Some("Certificate expired")
            } else if !token_matches {
                Some("Token hash mismatch")
            } else if !signed_by_issuer {
                Some("Invalid signature")
            } else {
                None
            };
            prop_assert_eq!(verdict.reason(), expected);
            prop_assert_eq!(verdict.is_valid(), expected.is_none());
        }
    }
}
