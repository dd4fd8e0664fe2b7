use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tal_ledger::LedgerError;
use tal_registry::RegistryError;
use thiserror::Error;

/// Errors from service orchestration and server startup.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A certificate names an anchor block the ledger does not hold.
    #[error("ledger block not found: {0}")]
    AnchorNotFound(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("store error: {0}")]
    Store(#[from] tal_store::StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Error returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    InvalidPayload(String),

    #[error("{0}")]
    InvalidSignature(String),

    #[error("{0}")]
    LedgerBlockNotFound(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_)
            | ApiError::InvalidPayload(_)
            | ApiError::InvalidSignature(_)
            | ApiError::LedgerBlockNotFound(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Storage(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ApiError::InvalidSignature(_) => "INVALID_SIGNATURE",
            ApiError::LedgerBlockNotFound(_) => "LEDGER_BLOCK_NOT_FOUND",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ServerError> for ApiError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::AnchorNotFound(_) => {
                ApiError::LedgerBlockNotFound("Ledger block not found".into())
            }
            ServerError::Registry(e) => e.into(),
            ServerError::Ledger(e) => e.into(),
            ServerError::Store(e) => ApiError::Storage(e.to_string()),
            ServerError::Io(e) => ApiError::Storage(e.to_string()),
            ServerError::Config(msg) | ServerError::Internal(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Conflict(id) => {
                ApiError::Conflict(format!("Certificate already exists: {id}"))
            }
            RegistryError::AlreadyRevoked(_) => ApiError::Conflict("Token already revoked".into()),
            RegistryError::InvalidPayload(msg) => ApiError::InvalidPayload(msg),
            RegistryError::InvalidSignature => {
                ApiError::InvalidSignature("Invalid signature".into())
            }
            RegistryError::Store(e) => ApiError::Storage(e.to_string()),
            RegistryError::LockPoisoned => ApiError::Internal("registry lock poisoned".into()),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Store(e) => ApiError::Storage(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
