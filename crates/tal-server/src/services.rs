//! Composite operations spanning the ledger and the registries.
//!
//! The stores know nothing of each other. Everything that
//! crosses store boundaries lives here: the anchor-block check on
//! registration, the full trust decision on verification, and the ledger
//! entries recorded for revocations and key registrations.

use std::path::Path;
use std::sync::Arc;

use tal_crypto::ContentHasher;
use tal_ledger::{Block, Ledger};
use tal_registry::{
    Certificate, CertificateRegistry, CertificateVerification, PayloadDraft, PublicKeyDirectory,
    RegistryError, RevocationRecord, RevocationRegistry,
};
use tal_store::{DocumentStore, FileDocumentStore};
use tracing::{error, info, warn};

use crate::error::{ServerError, ServerResult};

/// Ledger action recorded when a token is revoked.
pub const REVOKE_TOKEN_ACTION: &str = "REVOKE_TOKEN";

/// Ledger action recorded when a user's public key is registered.
pub const REGISTER_PUBLIC_KEY_ACTION: &str = "REGISTER_PUBLIC_KEY";

/// Result of the composite trust check on a certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TrustVerdict {
    /// Every check passed.
    Trusted {
        certificate: Box<Certificate>,
        block: Block,
    },
    /// The certificate failed its own checks.
    Rejected(CertificateVerification),
    /// The certificate is valid but its token has been revoked.
    Revoked(RevocationRecord),
    /// The anchor block is not in the ledger.
    AnchorMissing,
    /// The ledger chain fails verification.
    ChainBroken,
}

impl TrustVerdict {
    pub fn is_trusted(&self) -> bool {
        matches!(self, Self::Trusted { .. })
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Trusted { .. } => None,
            Self::Rejected(local) => local.reason(),
            Self::Revoked(_) => Some("Token has been revoked"),
            Self::AnchorMissing => Some("Ledger block not found"),
            Self::ChainBroken => Some("Ledger integrity check failed"),
        }
    }
}

/// The four stores, constructed once and shared by every handler.
pub struct TrustServices {
    ledger: Ledger,
    certificates: CertificateRegistry,
    revocations: RevocationRegistry,
    public_keys: PublicKeyDirectory,
}

impl TrustServices {
    /// Open every store against the same document store.
    pub fn open(store: Arc<dyn DocumentStore>) -> ServerResult<Self> {
        Ok(Self {
            ledger: Ledger::open(Arc::clone(&store))?,
            certificates: CertificateRegistry::open(Arc::clone(&store))?,
            revocations: RevocationRegistry::open(Arc::clone(&store))?,
            public_keys: PublicKeyDirectory::open(store)?,
        })
    }

    /// Open every store from JSON documents under `data_dir`.
    pub fn open_dir(data_dir: impl AsRef<Path>) -> ServerResult<Self> {
        let store = FileDocumentStore::open(data_dir)?;
        info!(data_dir = %store.root().display(), "opening trust services");
        Self::open(Arc::new(store))
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn certificates(&self) -> &CertificateRegistry {
        &self.certificates
    }

    pub fn revocations(&self) -> &RevocationRegistry {
        &self.revocations
    }

    pub fn public_keys(&self) -> &PublicKeyDirectory {
        &self.public_keys
    }

    /// Register a certificate whose payload is anchored to an existing
    /// ledger block.
    ///
    /// Fails with `Conflict` for a known id, then `InvalidPayload` for
    /// missing members, then `AnchorNotFound`, then `InvalidSignature`.
    pub fn register_certificate(
        &self,
        certificate_id: &str,
        draft: PayloadDraft,
        signature: &str,
        issuer_public_key: &str,
    ) -> ServerResult<Certificate> {
        if self.certificates.get(certificate_id)?.is_some() {
            warn!(certificate_id, "rejected duplicate certificate");
            return Err(RegistryError::Conflict(certificate_id.to_string()).into());
        }
        if certificate_id.is_empty() {
            return Err(RegistryError::InvalidPayload("certificateId is required".into()).into());
        }
        let payload = draft.into_payload()?;
        let anchor = payload.ledger_block_hash.as_str();
        if self.ledger.get_by_hash(anchor)?.is_none() {
            warn!(certificate_id, anchor, "certificate anchor block not in ledger");
            return Err(ServerError::AnchorNotFound(anchor.to_string()));
        }
        let certificate = self.certificates.register(
            certificate_id,
            payload.into(),
            signature,
            issuer_public_key,
        )?;
        info!(certificate_id, "certificate registered");
        Ok(certificate)
    }

    /// Full trust decision for presenting `token` against a certificate.
    ///
    /// Checks, stopping at the first failure: certificate-local
    /// verification, revocation of the token fingerprint, presence of the
    /// anchor block, and integrity of the whole chain.
    pub fn verify_certificate(
        &self,
        certificate_id: &str,
        token: &str,
    ) -> ServerResult<TrustVerdict> {
        let verdict = self.evaluate(certificate_id, token)?;
        if let Some(reason) = verdict.reason() {
            warn!(certificate_id, reason, "certificate not trusted");
        }
        Ok(verdict)
    }

    fn evaluate(&self, certificate_id: &str, token: &str) -> ServerResult<TrustVerdict> {
        let certificate = match self.certificates.verify(certificate_id, token)? {
            CertificateVerification::Valid(certificate) => certificate,
            local => return Ok(TrustVerdict::Rejected(local)),
        };
        let presented = ContentHasher::hash_hex(token.as_bytes());
        if let Some(record) = self.revocations.info(&presented)? {
            return Ok(TrustVerdict::Revoked(record));
        }
        let Some(block) = self.ledger.get_by_hash(&certificate.payload.ledger_block_hash)? else {
            return Ok(TrustVerdict::AnchorMissing);
        };
        if !self.ledger.verify()? {
            return Ok(TrustVerdict::ChainBroken);
        }
        Ok(TrustVerdict::Trusted { certificate, block })
    }

    /// Revoke a token fingerprint and record the revocation in the ledger.
    ///
    /// The revocation is durable before the ledger append is attempted. If
    /// the append fails the revocation stands and the error is returned.
    pub fn revoke_token(
        &self,
        token_hash: &str,
        reason: Option<&str>,
    ) -> ServerResult<(RevocationRecord, Block)> {
        let record = self.revocations.revoke(token_hash, reason)?;
        let block = self
            .ledger
            .append(REVOKE_TOKEN_ACTION, token_hash)
            .inspect_err(|e| {
                error!(token_hash, error = %e, "token revoked but ledger append failed");
            })?;
        info!(token_hash, block = block.index, "token revoked");
        Ok((record, block))
    }

    /// Set a user's public key and anchor its fingerprint in the ledger.
    pub fn register_public_key(&self, user_id: &str, public_key: &str) -> ServerResult<Block> {
        self.public_keys.register(user_id, public_key)?;
        let fingerprint = ContentHasher::hash_hex(public_key.as_bytes());
        let block = self
            .ledger
            .append(REGISTER_PUBLIC_KEY_ACTION, &fingerprint)
            .inspect_err(|e| {
                error!(user_id, error = %e, "public key stored but ledger append failed");
            })?;
        info!(user_id, block = block.index, "public key registered");
        Ok(block)
    }
}
