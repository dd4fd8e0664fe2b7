use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, certificates, ledger, tokens, users, AppState};

/// Build the axum router with all TAL endpoints.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        // Ledger
        .route(
            "/ledger/blocks",
            get(ledger::list_blocks).post(ledger::append_block),
        )
        .route("/ledger/blocks/index/:index", get(ledger::get_block_by_index))
        .route("/ledger/blocks/:hash", get(ledger::get_block_by_hash))
        .route("/ledger/verify", get(ledger::verify_chain))
        .route("/ledger/stats", get(ledger::ledger_stats))
        // Certificates
        .route(
            "/certificates",
            get(certificates::list_certificates).post(certificates::register_certificate),
        )
        .route("/certificates/stats", get(certificates::certificate_stats))
        .route(
            "/certificates/issuer/:user_id",
            get(certificates::certificates_by_issuer),
        )
        .route(
            "/certificates/:certificate_id",
            get(certificates::get_certificate),
        )
        .route(
            "/certificates/:certificate_id/verify",
            post(certificates::verify_certificate),
        )
        // Tokens
        .route("/tokens/revoke", post(tokens::revoke_token))
        .route("/tokens/revoked", get(tokens::list_revoked))
        .route("/tokens/revoked/:token_hash", get(tokens::check_revocation))
        .route("/tokens/stats", get(tokens::token_stats))
        // Public keys
        .route("/users/public-keys", get(users::list_public_keys))
        .route(
            "/users/:user_id/public-key",
            get(users::get_public_key).post(users::register_public_key),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
