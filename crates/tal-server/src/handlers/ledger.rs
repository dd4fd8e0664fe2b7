use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tal_ledger::{Block, LedgerStats};

use super::{blocking, required, AppState};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendBlockRequest {
    pub action: Option<String>,
    pub data_hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlockList {
    pub total: usize,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Serialize)]
pub struct ChainVerification {
    pub valid: bool,
    pub stats: LedgerStats,
}

/// POST /ledger/blocks
pub async fn append_block(
    State(state): State<AppState>,
    payload: Result<Json<AppendBlockRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Block>), ApiError> {
    let Json(request) = payload?;
    let action = required(request.action, "action")?;
    let data_hash = required(request.data_hash, "dataHash")?;

    let block = blocking(move || Ok(state.ledger().append(&action, &data_hash)?)).await?;
    Ok((StatusCode::CREATED, Json(block)))
}

/// GET /ledger/blocks/:hash
pub async fn get_block_by_hash(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Block>, ApiError> {
    state
        .ledger()
        .get_by_hash(&hash)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Block not found".into()))
}

/// GET /ledger/blocks/index/:index
pub async fn get_block_by_index(
    State(state): State<AppState>,
    Path(index): Path<String>,
) -> Result<Json<Block>, ApiError> {
    let index: u64 = index
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid block index".into()))?;
    state
        .ledger()
        .get_by_index(index)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Block not found".into()))
}

/// GET /ledger/blocks
pub async fn list_blocks(State(state): State<AppState>) -> Result<Json<BlockList>, ApiError> {
    let blocks = state.ledger().all()?;
    Ok(Json(BlockList {
        total: blocks.len(),
        blocks,
    }))
}

/// GET /ledger/verify
pub async fn verify_chain(
    State(state): State<AppState>,
) -> Result<Json<ChainVerification>, ApiError> {
    let stats = state.ledger().stats()?;
    Ok(Json(ChainVerification {
        valid: stats.is_valid,
        stats,
    }))
}

/// GET /ledger/stats
pub async fn ledger_stats(State(state): State<AppState>) -> Result<Json<LedgerStats>, ApiError> {
    Ok(Json(state.ledger().stats()?))
}
