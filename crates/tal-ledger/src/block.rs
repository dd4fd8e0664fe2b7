use serde::{Deserialize, Serialize};
use tal_crypto::{ChainLink, ContentHasher};
use tal_types::Timestamp;

/// Action tag of the index-0 block.
pub const GENESIS_ACTION: &str = "GENESIS";

/// Predecessor sentinel carried by the genesis block.
pub const GENESIS_PREV_HASH: &str = "0";

/// Fixed string whose hash is the genesis block's `dataHash`.
pub const GENESIS_SEED: &str = "Trust Anchor Ledger Genesis Block";

/// One entry of the ledger.
///
/// `hash` commits to every other field, and `prev_hash` commits to the
/// predecessor, so altering any stored block is detectable by
/// [`crate::Ledger::verify`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub index: u64,
    pub timestamp: Timestamp,
    pub action: String,
    pub data_hash: String,
    pub prev_hash: String,
    pub hash: String,
}

impl Block {
    /// Build a block and seal it with its computed hash.
    pub fn new(
        index: u64,
        timestamp: Timestamp,
        action: impl Into<String>,
        data_hash: impl Into<String>,
        prev_hash: impl Into<String>,
    ) -> Self {
        let action = action.into();
        let data_hash = data_hash.into();
        let prev_hash = prev_hash.into();
        let hash = Self::compute_hash(index, timestamp, &action, &data_hash, &prev_hash);
        Self {
            index,
            timestamp,
            action,
            data_hash,
            prev_hash,
            hash,
        }
    }

    /// The genesis block stamped at `timestamp`.
    pub fn genesis(timestamp: Timestamp) -> Self {
        Self::new(
            0,
            timestamp,
            GENESIS_ACTION,
            ContentHasher::hash_hex(GENESIS_SEED.as_bytes()),
            GENESIS_PREV_HASH,
        )
    }

    /// The successor of `self` recording `action` over `data_hash`.
    pub fn next(&self, timestamp: Timestamp, action: &str, data_hash: &str) -> Self {
        Self::new(self.index + 1, timestamp, action, data_hash, self.hash.clone())
    }

    /// Block hash: SHA-256 over the decimal index, decimal millisecond
    /// timestamp, action, data hash and previous hash, concatenated without
    /// separators.
    pub fn compute_hash(
        index: u64,
        timestamp: Timestamp,
        action: &str,
        data_hash: &str,
        prev_hash: &str,
    ) -> String {
        let preimage = format!(
            "{index}{}{action}{data_hash}{prev_hash}",
            timestamp.as_millis()
        );
        ContentHasher::hash_hex(preimage.as_bytes())
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0
    }
}

impl ChainLink for Block {
    fn stored_hash(&self) -> &str {
        &self.hash
    }

    fn stored_prev_hash(&self) -> &str {
        &self.prev_hash
    }

    fn computed_hash(&self) -> String {
        Self::compute_hash(
            self.index,
            self.timestamp,
            &self.action,
            &self.data_hash,
            &self.prev_hash,
        )
    }
}
