//! Durable keyed document storage for the Trust Anchor Ledger.
//!
//! Each TAL store (ledger chain, certificates, revocations, public keys) owns
//! exactly one document and rewrites it in full on every mutation. This crate
//! is the boundary to the physical medium: the stores only ever ask to "load
//! the value for a key" and "durably store the value for a key".
//!
//! # Storage Backends
//!
//! All backends implement the [`DocumentStore`] trait:
//!
//! - [`FileDocumentStore`] -- one pretty-printed JSON file per key, written
//!   with temp-file + fsync + atomic rename
//! - [`InMemoryDocumentStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. A successful `store` is durable before it returns.
//! 2. A crash mid-write never leaves a half-written document behind.
//! 3. A document that exists but cannot be decoded is an error, never an
//!    empty default.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use traits::{load_document, store_document, validate_key, DocumentStore};
