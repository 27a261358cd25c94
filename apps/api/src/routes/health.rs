use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus current admission load.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let limiter = state.orchestrator.limiter();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "analysis-api",
        "inFlight": limiter.in_flight(),
        "maxConcurrent": limiter.max_concurrent(),
        "persistent": state.config.database_url.is_some(),
        "sharedCache": state.config.redis_url.is_some()
    }))
}
