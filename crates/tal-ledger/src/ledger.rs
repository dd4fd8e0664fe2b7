use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tal_crypto::{ChainError, HashChainVerifier};
use tal_store::{load_document, store_document, DocumentStore};
use tal_types::Timestamp;
use tracing::{debug, error, info, warn};

use crate::block::Block;
use crate::error::{LedgerError, LedgerResult};

/// Document key under which the chain is persisted.
pub const CHAIN_KEY: &str = "chain";

/// Summary of the chain for operators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    pub total_blocks: usize,
    pub genesis_timestamp: Timestamp,
    pub latest_timestamp: Timestamp,
    pub is_valid: bool,
}

/// Append-only, hash-chained ledger.
///
/// A single write lock serializes appends; each append persists the whole
/// chain before returning and is rolled back if that write fails, so memory
/// never runs ahead of durable state.
pub struct Ledger {
    store: Arc<dyn DocumentStore>,
    inner: RwLock<ChainState>,
}

struct ChainState {
    blocks: Vec<Block>,
    hash_index: HashMap<String, usize>,
}

impl ChainState {
    fn from_blocks(blocks: Vec<Block>) -> Self {
        let hash_index = blocks
            .iter()
            .enumerate()
            .map(|(pos, b)| (b.hash.clone(), pos))
            .collect();
        Self { blocks, hash_index }
    }

    fn push(&mut self, block: Block) {
        self.hash_index.insert(block.hash.clone(), self.blocks.len());
        self.blocks.push(block);
    }

    fn pop(&mut self) {
        if let Some(block) = self.blocks.pop() {
            self.hash_index.remove(&block.hash);
        }
    }
}

impl Ledger {
    /// Load the chain from `store`, creating and persisting the genesis
    /// block if no chain exists yet.
    ///
    /// A stored chain is loaded as-is, without verification, so that
    /// tampering remains observable through [`Ledger::verify`].
    pub fn open(store: Arc<dyn DocumentStore>) -> LedgerResult<Self> {
        let blocks: Vec<Block> = load_document(store.as_ref(), CHAIN_KEY)?.unwrap_or_default();

        let blocks = if blocks.is_empty() {
            let genesis = Block::genesis(Timestamp::now());
            let chain = vec![genesis];
            store_document(store.as_ref(), CHAIN_KEY, &chain)?;
            info!(hash = %chain[0].hash, "created genesis block");
            chain
        } else {
            info!(blocks = blocks.len(), "loaded ledger chain");
            blocks
        };

        Ok(Self {
            store,
            inner: RwLock::new(ChainState::from_blocks(blocks)),
        })
    }

    /// Append a block recording `action` over `data_hash`.
    pub fn append(&self, action: &str, data_hash: &str) -> LedgerResult<Block> {
        let mut state = self.inner.write().map_err(|_| LedgerError::LockPoisoned)?;
        let head = state.blocks.last().ok_or(LedgerError::MissingGenesis)?;
        let block = head.next(Timestamp::now(), action, data_hash);

        state.push(block.clone());
        if let Err(e) = store_document(self.store.as_ref(), CHAIN_KEY, &state.blocks) {
            state.pop();
            error!(action, error = %e, "failed to persist chain; append rolled back");
            return Err(e.into());
        }

        debug!(index = block.index, action, hash = %block.hash, "appended block");
        Ok(block)
    }

    /// Look up a block by its hash.
    pub fn get_by_hash(&self, hash: &str) -> LedgerResult<Option<Block>> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state
            .hash_index
            .get(hash)
            .and_then(|&pos| state.blocks.get(pos))
            .cloned())
    }

    /// Look up a block by its position in the chain.
    pub fn get_by_index(&self, index: u64) -> LedgerResult<Option<Block>> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        let Ok(pos) = usize::try_from(index) else {
            return Ok(None);
        };
        Ok(state.blocks.get(pos).cloned())
    }

    /// Snapshot of the whole chain, ordered by index.
    pub fn all(&self) -> LedgerResult<Vec<Block>> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.blocks.clone())
    }

    /// The most recent block.
    pub fn head(&self) -> LedgerResult<Block> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        state.blocks.last().cloned().ok_or(LedgerError::MissingGenesis)
    }

    pub fn len(&self) -> LedgerResult<usize> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.blocks.len())
    }

    /// Check the chain and report the first violation found.
    pub fn audit(&self) -> LedgerResult<Result<(), ChainError>> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        let verdict = HashChainVerifier::verify_chain(&state.blocks);
        if let Err(violation) = &verdict {
            warn!(%violation, "ledger chain failed verification");
        }
        Ok(verdict)
    }

    /// Whether every block's hash and predecessor link are intact.
    pub fn verify(&self) -> LedgerResult<bool> {
        Ok(self.audit()?.is_ok())
    }

    pub fn stats(&self) -> LedgerResult<LedgerStats> {
        let is_valid = self.verify()?;
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        let genesis = state.blocks.first().ok_or(LedgerError::MissingGenesis)?;
        let latest = state.blocks.last().ok_or(LedgerError::MissingGenesis)?;
        Ok(LedgerStats {
            total_blocks: state.blocks.len(),
            genesis_timestamp: genesis.timestamp,
            latest_timestamp: latest.timestamp,
            is_valid,
        })
    }
}
