//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::analysis::audit::AuditEntry;
use crate::errors::AppError;
use crate::models::request::InboundRequest;
use crate::models::result::{AggregatedResult, AnalysisResponse};
use crate::state::AppState;

const DEFAULT_AUDIT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<usize>,
}

/// POST /api/v1/analyses
///
/// Runs (or serves from cache) an analysis for the submitted record.
/// Returns 503 when the service is at capacity.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(inbound): Json<InboundRequest>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let request = inbound.into_request();
    let outcome = state.orchestrator.analyze(request).await?;

    if outcome.cache_hit {
        info!(analysis_id = %outcome.result.request_id, "Served analysis from cache");
    }

    Ok(Json(AnalysisResponse::from_result(
        &outcome.result,
        outcome.cache_hit,
    )))
}

/// GET /api/v1/analyses/:id
///
/// Full stored result, including per-module breakdown.
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<Uuid>,
) -> Result<Json<AggregatedResult>, AppError> {
    state
        .orchestrator
        .find(analysis_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Analysis {analysis_id} not found")))
}

/// POST /api/v1/cache/invalidate
///
/// Takes the same body as an analysis request and evicts its cached result.
pub async fn handle_invalidate(
    State(state): State<AppState>,
    Json(inbound): Json<InboundRequest>,
) -> Result<Json<Value>, AppError> {
    let key = state.orchestrator.invalidate(&inbound.into_request()).await?;
    Ok(Json(json!({ "evicted": key.as_str() })))
}

/// GET /api/v1/audit?limit=
pub async fn handle_audit(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Json<Vec<AuditEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
    Json(state.orchestrator.audit().recent(limit).await)
}
