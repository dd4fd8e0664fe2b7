use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tal_ledger::Block;
use tal_registry::RevocationRecord;

use super::{blocking, required, AppState};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeTokenRequest {
    pub token_hash: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeTokenResponse {
    pub revocation_info: RevocationRecord,
    pub ledger_block: Block,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationStatus {
    pub token_hash: String,
    pub is_revoked: bool,
    pub revocation_info: Option<RevocationRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokedTokenList {
    pub total: usize,
    pub revoked_tokens: Vec<RevocationRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStats {
    pub total_revoked: usize,
    pub total_public_keys: usize,
}

/// POST /tokens/revoke
pub async fn revoke_token(
    State(state): State<AppState>,
    payload: Result<Json<RevokeTokenRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RevokeTokenResponse>), ApiError> {
    let Json(request) = payload?;
    let token_hash = required(request.token_hash, "tokenHash")?;
    let reason = request.reason;

    let (revocation_info, ledger_block) =
        blocking(move || Ok(state.revoke_token(&token_hash, reason.as_deref())?)).await?;
    Ok((
        StatusCode::CREATED,
        Json(RevokeTokenResponse {
            revocation_info,
            ledger_block,
        }),
    ))
}

/// GET /tokens/revoked/:token_hash
pub async fn check_revocation(
    State(state): State<AppState>,
    Path(token_hash): Path<String>,
) -> Result<Json<RevocationStatus>, ApiError> {
    let revocation_info = state.revocations().info(&token_hash)?;
    Ok(Json(RevocationStatus {
        token_hash,
        is_revoked: revocation_info.is_some(),
        revocation_info,
    }))
}

/// GET /tokens/revoked
pub async fn list_revoked(
    State(state): State<AppState>,
) -> Result<Json<RevokedTokenList>, ApiError> {
    let revoked_tokens = state.revocations().all()?;
    Ok(Json(RevokedTokenList {
        total: revoked_tokens.len(),
        revoked_tokens,
    }))
}

/// GET /tokens/stats
pub async fn token_stats(State(state): State<AppState>) -> Result<Json<TokenStats>, ApiError> {
    Ok(Json(TokenStats {
        total_revoked: state.revocations().count()?,
        total_public_keys: state.public_keys().count()?,
    }))
}
