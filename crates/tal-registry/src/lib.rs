//! Registries for the Trust Anchor Ledger (TAL).
//!
//! Three independent stores, each owning one persisted document and one
//! write lock:
//! - [`CertificateRegistry`]: insert-only signed certificates with
//!   certificate-local verification
//! - [`RevocationRegistry`]: insert-only, monotonic set of revoked token
//!   fingerprints
//! - [`PublicKeyDirectory`]: last-write-wins map of user id to public key
//!
//! None of them holds a reference to the ledger or to each other. Cross
//! checks (revocation, anchor block, chain integrity) belong to the caller.

pub mod certificates;
pub mod error;
pub mod public_keys;
pub mod revocations;

pub use certificates::{
    Certificate, CertificatePayload, CertificateRegistry, CertificateStats,
    CertificateVerification, PayloadDraft, CERTIFICATES_KEY,
};
pub use error::{RegistryError, RegistryResult};
pub use public_keys::{PublicKeyDirectory, PUBLIC_KEYS_KEY};
pub use revocations::{RevocationRecord, RevocationRegistry, DEFAULT_REASON, REVOCATIONS_KEY};
