/// A record that participates in a linear hash chain.
pub trait ChainLink {
    /// The hash stored on the record.
    fn stored_hash(&self) -> &str;
    /// The predecessor hash stored on the record.
    fn stored_prev_hash(&self) -> &str;
    /// The hash recomputed from the record's current contents.
    fn computed_hash(&self) -> String;
}

/// Hash chain integrity verifier.
///
/// Verifies that a sequence of records forms a valid hash chain: every
/// record's stored hash equals its recomputed hash, and every record after
/// the first links to its predecessor's stored hash. The first record's
/// predecessor field is not checked (it carries a sentinel), but its own
/// hash is.
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Verify a chain, stopping at the first violation.
    pub fn verify_chain(links: &[impl ChainLink]) -> Result<(), ChainError> {
        for (index, link) in links.iter().enumerate() {
            if link.computed_hash() != link.stored_hash() {
                return Err(ChainError::HashMismatch { index });
            }
            if index > 0 && link.stored_prev_hash() != links[index - 1].stored_hash() {
                return Err(ChainError::BrokenLink { index });
            }
        }
        Ok(())
    }
}

/// Errors from chain verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("broken link at index {index}: prev hash does not match predecessor")]
    BrokenLink { index: usize },

    #[error("hash mismatch at index {index}: computed hash differs from stored")]
    HashMismatch { index: usize },
}
