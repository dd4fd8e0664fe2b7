//! HTTP handlers, grouped by resource.

pub mod certificates;
pub mod ledger;
pub mod tokens;
pub mod users;

use std::sync::Arc;

use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};
use tal_types::Timestamp;

use crate::error::ApiError;
use crate::services::TrustServices;

/// Shared handler state.
pub type AppState = Arc<TrustServices>;

pub const SERVICE_NAME: &str = "Trust Anchor Ledger";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: Timestamp,
    pub service: String,
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Append-only trust anchor for credential certificates and token revocations",
        "endpoints": {
            "ledger": "/ledger",
            "certificates": "/certificates",
            "tokens": "/tokens",
            "users": "/users",
            "health": "/health",
        },
    }))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".into(),
        timestamp: Timestamp::now(),
        service: SERVICE_NAME.into(),
    })
}

/// Fallback for unknown routes.
pub async fn not_found() -> ApiError {
    ApiError::NotFound("Not Found".into())
}

/// A request member that must be present and non-empty.
pub(crate) fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("Missing {name}")))
}

/// Run a store mutation off the async workers; every write fsyncs.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
}
