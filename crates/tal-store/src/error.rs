/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The document key contains characters outside `[A-Za-z0-9_-]` or is empty.
    #[error("invalid document key: {0:?}")]
    InvalidKey(String),

    /// Serialization or deserialization failure.
    #[error("serialization error for {key}: {reason}")]
    Serialization { key: String, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Storage backend is read-only or otherwise refuses writes.
    #[error("store is read-only")]
    ReadOnly,

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
