use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tal_ledger::Block;
use tal_registry::{Certificate, CertificateStats, PayloadDraft, RevocationRecord};

use super::{blocking, required, AppState};
use crate::error::ApiError;
use crate::services::TrustVerdict;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCertificateRequest {
    pub certificate_id: Option<String>,
    pub payload: Option<PayloadDraft>,
    pub signature: Option<String>,
    pub issuer_public_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCertificateRequest {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CertificateList {
    pub total: usize,
    pub certificates: Vec<Certificate>,
}

/// Composite verification outcome as returned to clients.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCertificateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Certificate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_info: Option<RevocationRecord>,
}

impl From<TrustVerdict> for VerifyCertificateResponse {
    fn from(verdict: TrustVerdict) -> Self {
        let reason = verdict.reason().map(str::to_string);
        match verdict {
            TrustVerdict::Trusted { certificate, block } => Self {
                valid: true,
                certificate: Some(*certificate),
                block: Some(block),
                ..Default::default()
            },
            TrustVerdict::Revoked(record) => Self {
                reason,
                revocation_info: Some(record),
                ..Default::default()
            },
            _ => Self {
                reason,
                ..Default::default()
            },
        }
    }
}

/// POST /certificates
pub async fn register_certificate(
    State(state): State<AppState>,
    payload: Result<Json<RegisterCertificateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Certificate>), ApiError> {
    let Json(request) = payload?;
    let certificate_id = required(request.certificate_id, "certificateId")?;
    let signature = required(request.signature, "signature")?;
    let issuer_public_key = required(request.issuer_public_key, "issuerPublicKey")?;
    let draft = request
        .payload
        .ok_or_else(|| ApiError::BadRequest("Missing payload".into()))?;

    let certificate = blocking(move || {
        Ok(state.register_certificate(&certificate_id, draft, &signature, &issuer_public_key)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(certificate)))
}

/// GET /certificates/:certificate_id
pub async fn get_certificate(
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
) -> Result<Json<Certificate>, ApiError> {
    state
        .certificates()
        .get(&certificate_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Certificate not found".into()))
}

/// GET /certificates
pub async fn list_certificates(
    State(state): State<AppState>,
) -> Result<Json<CertificateList>, ApiError> {
    let certificates = state.certificates().all()?;
    Ok(Json(CertificateList {
        total: certificates.len(),
        certificates,
    }))
}

/// POST /certificates/:certificate_id/verify
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(certificate_id): Path<String>,
    payload: Result<Json<VerifyCertificateRequest>, JsonRejection>,
) -> Result<Json<VerifyCertificateResponse>, ApiError> {
    let Json(request) = payload?;
    let token = required(request.token, "token")?;
    let verdict = state.verify_certificate(&certificate_id, &token)?;
    Ok(Json(verdict.into()))
}

/// GET /certificates/issuer/:user_id
pub async fn certificates_by_issuer(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CertificateList>, ApiError> {
    let certificates = state.certificates().by_issuer(&user_id)?;
    Ok(Json(CertificateList {
        total: certificates.len(),
        certificates,
    }))
}

/// GET /certificates/stats
pub async fn certificate_stats(
    State(state): State<AppState>,
) -> Result<Json<CertificateStats>, ApiError> {
    Ok(Json(state.certificates().stats()?))
}
