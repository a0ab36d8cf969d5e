//! API handlers for the Privacy Shield server
//!
//! Provides REST endpoints for:
//! - Document analysis (extraction, redaction, risk scoring)
//! - Token balance and pack purchases
//! - Per-user analysis history
//!
//! Callers are identified by the `x-user-id` header, which the session
//! layer in front of this server sets.

use std::sync::Mutex;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use pipeline_core::PipelineState;
use serde::{Deserialize, Serialize};
use shared_types::{
    AnalysisRecord, AnalysisResult, DocumentUpload, ExtractionResult, RedactionResult,
};
use token_ledger::{TokenPack, TOKEN_PACKS};
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::AppState;

pub const USER_HEADER: &str = "x-user-id";
/// Shared secret of the payment service, required to credit tokens
pub const CREDIT_SECRET_HEADER: &str = "x-credit-secret";

pub(crate) fn user_id(headers: &HeaderMap) -> Result<String, ServerError> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ServerError::MissingUser)
}

/// Compares in time independent of where the inputs differ
fn secrets_match(expected: &[u8], given: &[u8]) -> bool {
    expected.len() == given.len()
        && expected
            .iter()
            .zip(given)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

pub(crate) fn authorize_credit(
    headers: &HeaderMap,
    secret: Option<&str>,
) -> Result<(), ServerError> {
    let expected = secret.ok_or(ServerError::CreditForbidden)?;
    let given = headers
        .get(CREDIT_SECRET_HEADER)
        .map(|v| v.as_bytes())
        .ok_or(ServerError::CreditForbidden)?;
    if secrets_match(expected.as_bytes(), given) {
        Ok(())
    } else {
        Err(ServerError::CreditForbidden)
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "shield-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Analyze request body
#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub file_name: String,
    /// e.g. "application/pdf", "image/png"
    pub mime_type: String,
    /// Base64-encoded document bytes
    pub data_base64: String,
}

/// Analyze response
#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub record_id: String,
    pub extraction: ExtractionResult,
    pub redaction: RedactionResult,
    pub analysis: AnalysisResult,
    /// States the run passed through, starting after `idle`
    pub states: Vec<PipelineState>,
    pub balance: u32,
}

/// Handler: POST /api/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ServerError> {
    let user = user_id(&headers)?;
    let bytes = STANDARD
        .decode(req.data_base64.trim())
        .map_err(|e| ServerError::InvalidRequest(format!("data_base64 is not valid base64: {}", e)))?;

    info!(
        user = %user,
        file = %req.file_name,
        mime = %req.mime_type,
        len = bytes.len(),
        "Analyze request"
    );

    let upload = DocumentUpload::new(req.file_name, req.mime_type, bytes);
    let states = Mutex::new(Vec::new());
    let observer = |_from: PipelineState, to: PipelineState| {
        if let Ok(mut states) = states.lock() {
            states.push(to);
        }
    };

    let outcome = state
        .pipeline
        .analyze_document(upload, &user, &observer)
        .await?;

    let states = states.into_inner().unwrap_or_default();
    debug!(user = %user, ?states, "run finished");

    Ok(Json(AnalyzeResponse {
        success: true,
        record_id: outcome.record_id,
        extraction: outcome.extraction,
        redaction: outcome.redaction,
        analysis: outcome.analysis,
        states,
        balance: outcome.balance.balance,
    }))
}

/// Balance response
#[derive(Serialize)]
pub struct BalanceResponse {
    pub success: bool,
    pub balance: u32,
    pub cap: u32,
}

/// Handler: GET /api/tokens
pub async fn handle_balance(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BalanceResponse>, ServerError> {
    let user = user_id(&headers)?;
    let account = state.pipeline.ledger().balance(&user).await?;

    Ok(Json(BalanceResponse {
        success: true,
        balance: account.balance,
        cap: account.cap,
    }))
}

/// Pack list response
#[derive(Serialize)]
pub struct PackListResponse {
    pub success: bool,
    pub packs: &'static [TokenPack],
}

/// Handler: GET /api/token-packs
pub async fn handle_list_packs() -> Json<PackListResponse> {
    Json(PackListResponse {
        success: true,
        packs: TOKEN_PACKS,
    })
}

/// Credit request body
#[derive(Deserialize)]
pub struct CreditRequest {
    pub pack: String,
}

/// Handler: POST /api/tokens/credit
///
/// Called by the payment service once checkout has completed; it must send
/// the configured `x-credit-secret`.
pub async fn handle_credit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreditRequest>,
) -> Result<Json<BalanceResponse>, ServerError> {
    let user = user_id(&headers)?;
    if let Err(err) = authorize_credit(&headers, state.credit_secret.as_deref()) {
        warn!(user = %user, pack = %req.pack, "Credit refused: caller is not the payment service");
        return Err(err);
    }
    let account = state.pipeline.ledger().credit_pack(&user, &req.pack).await?;
    info!(user = %user, pack = %req.pack, balance = account.balance, "Pack credited");

    Ok(Json(BalanceResponse {
        success: true,
        balance: account.balance,
        cap: account.cap,
    }))
}

/// History list response
#[derive(Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub records: Vec<AnalysisRecord>,
    pub count: usize,
}

/// Handler: GET /api/history
pub async fn handle_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<HistoryResponse>, ServerError> {
    let user = user_id(&headers)?;
    let records = state.pipeline.history().list(&user).await?;
    let count = records.len();

    Ok(Json(HistoryResponse {
        success: true,
        records,
        count,
    }))
}

/// Handler: GET /api/history/:id
pub async fn handle_history_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(record_id): Path<String>,
) -> Result<Json<AnalysisRecord>, ServerError> {
    let user = user_id(&headers)?;
    let record = state.pipeline.history().get(&user, &record_id).await?;
    record.map(Json).ok_or(ServerError::RecordNotFound(record_id))
}

/// Clear response
#[derive(Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub removed: usize,
}

/// Handler: DELETE /api/history
pub async fn handle_clear_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ClearResponse>, ServerError> {
    let user = user_id(&headers)?;
    let removed = state.pipeline.history().clear(&user).await?;
    info!(user = %user, removed, "History cleared");

    Ok(Json(ClearResponse {
        success: true,
        removed,
    }))
}
