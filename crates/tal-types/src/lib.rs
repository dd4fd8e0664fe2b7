//! Foundation types for the Trust Anchor Ledger (TAL).
//!
//! The ledger, registries, server and CLI all build on these types.
//!
//! # Key Types
//!
//! - [`Timestamp`]: wall-clock milliseconds since the UNIX epoch
//! - [`Digest`]: SHA-256 content digest, rendered as lowercase hex

pub mod digest;
pub mod temporal;

pub use digest::Digest;
pub use temporal::Timestamp;
