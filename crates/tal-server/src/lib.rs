//! HTTP server for the Trust Anchor Ledger.
//!
//! Exposes the ledger, certificate, revocation and public key stores over a
//! JSON REST API and owns the composite trust decision that spans them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod services;

pub use config::ServerConfig;
pub use error::{ApiError, ErrorResponse, ServerError, ServerResult};
pub use router::build_router;
pub use server::TalServer;
pub use services::{TrustServices, TrustVerdict, REGISTER_PUBLIC_KEY_ACTION, REVOKE_TOKEN_ACTION};
