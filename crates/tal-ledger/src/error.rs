use tal_store::StoreError;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The chain document could not be read or durably written.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A loaded chain contained no blocks where a genesis block was required.
    #[error("chain has no genesis block")]
    MissingGenesis,

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
