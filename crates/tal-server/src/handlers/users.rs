use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tal_ledger::Block;

use super::{blocking, required, AppState};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPublicKeyRequest {
    pub public_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPublicKeyResponse {
    pub user_id: String,
    pub ledger_block: Block,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub user_id: String,
    pub public_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyList {
    pub total: usize,
    pub public_keys: BTreeMap<String, String>,
}

/// POST /users/:user_id/public-key
pub async fn register_public_key(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<RegisterPublicKeyRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterPublicKeyResponse>), ApiError> {
    let Json(request) = payload?;
    let public_key = required(request.public_key, "publicKey")?;

    let response_user = user_id.clone();
    let ledger_block =
        blocking(move || Ok(state.register_public_key(&user_id, &public_key)?)).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterPublicKeyResponse {
            user_id: response_user,
            ledger_block,
        }),
    ))
}

/// GET /users/:user_id/public-key
pub async fn get_public_key(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    let public_key = state
        .public_keys()
        .get(&user_id)?
        .ok_or_else(|| ApiError::NotFound("Public key not found".into()))?;
    Ok(Json(PublicKeyResponse {
        user_id,
        public_key,
    }))
}

/// GET /users/public-keys
pub async fn list_public_keys(
    State(state): State<AppState>,
) -> Result<Json<PublicKeyList>, ApiError> {
    let public_keys = state.public_keys().all()?;
    Ok(Json(PublicKeyList {
        total: public_keys.len(),
        public_keys,
    }))
}
