//! Cryptographic primitives for the Trust Anchor Ledger.
//!
//! Provides SHA-256 content hashing, canonical JSON serialization for signed
//! payloads, Ed25519 signing/verification, and hash chain verification.
//!
//! All functions here are pure: no state, no I/O. All crypto operations wrap
//! established libraries; there is no custom cryptography.

pub mod canonical;
pub mod chain;
pub mod hasher;
pub mod signer;

pub use canonical::{canonicalize, CanonicalError};
pub use chain::{ChainError, ChainLink, HashChainVerifier};
pub use hasher::ContentHasher;
pub use signer::{verify_signature, Signature, SignatureError, SigningKey, VerifyingKey};
