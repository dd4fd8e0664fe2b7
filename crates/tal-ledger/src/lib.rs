//! Append-only action ledger for the Trust Anchor Ledger (TAL).
//!
//! This crate is the tamper-evident spine of TAL. It provides:
//! - [`Block`] records, each hash-linked to its predecessor
//! - [`Ledger`], a single-writer chain persisted through a
//!   [`tal_store::DocumentStore`] with rollback on failed writes
//! - Lazy genesis creation and full-chain integrity verification
//! - [`LedgerStats`] summaries for operators

pub mod block;
pub mod error;
pub mod ledger;

pub use block::{Block, GENESIS_ACTION, GENESIS_PREV_HASH, GENESIS_SEED};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{Ledger, LedgerStats, CHAIN_KEY};
