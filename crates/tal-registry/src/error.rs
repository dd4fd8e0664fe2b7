use tal_store::StoreError;

/// Errors produced by registry mutations.
///
/// Negative verification outcomes are not errors; see
/// [`crate::CertificateVerification`].
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("certificate already exists: {0}")]
    Conflict(String),

    #[error("token already revoked: {0}")]
    AlreadyRevoked(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("registry lock poisoned")]
    LockPoisoned,
}

/// Result alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
