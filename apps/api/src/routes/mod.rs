pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/analyses", post(handlers::handle_analyze))
        .route("/api/v1/analyses/:id", get(handlers::handle_get_analysis))
        .route("/api/v1/cache/invalidate", post(handlers::handle_invalidate))
        .route("/api/v1/audit", get(handlers::handle_audit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::analysis::cache::InMemoryResultCache;
    use crate::analysis::store::InMemoryRecordStore;
    use crate::analysis::{Orchestrator, OrchestratorSettings};
    use crate::config::Config;
    use crate::modules::default_modules;

    fn app(settings: OrchestratorSettings) -> Router {
        let orchestrator = Orchestrator::new(
            default_modules().unwrap(),
            Arc::new(InMemoryResultCache::new()),
            Arc::new(InMemoryRecordStore::new()),
            settings,
        );
        build_router(AppState {
            orchestrator: Arc::new(orchestrator),
            config: Config {
                database_url: None,
                database_max_connections: 10,
                redis_url: None,
                port: 0,
                rust_log: "info".to_string(),
                max_concurrent_analyses: 16,
                reserved_priority_slots: 1,
                cache_ttl_secs: 60,
                module_timeout_ms: 5_000,
                audit_capacity: 100,
            },
        })
    }

    fn post_analysis(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/analyses")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn sample_request() -> Value {
        json!({
            "subjectRecord": {
                "title": "Senior Software Engineer",
                "workStyle": "collaborative",
                "dimensionScores": { "skills": 85, "experience": 70, "culture": 75, "growth": 80 }
            },
            "businessContext": { "industry": "SaaS", "teamWorkStyle": "adaptive" },
            "tier": "pro",
            "depth": "standard",
            "priority": 5
        })
    }

    #[tokio::test]
    async fn test_analyze_then_fetch_and_hit_cache() {
        let app = app(OrchestratorSettings::default());

        let response = app
            .clone()
            .oneshot(post_analysis(&sample_request()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let first = json_body(response).await;
        assert_eq!(first["cached"], false);
        assert_eq!(
            first["modulesUsed"],
            json!(["compatibility", "work_style", "retention_risk"])
        );

        let id = first["analysisId"].as_str().unwrap().to_string();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/analyses/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["requestId"], json!(id));

        let second = json_body(
            app.clone()
                .oneshot(post_analysis(&sample_request()))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(second["cached"], true);
        assert_eq!(second["analysisId"], first["analysisId"]);
        assert_eq!(second["overallScore"], first["overallScore"]);

        let audit = json_body(
            app.oneshot(
                Request::builder()
                    .uri("/api/v1/audit?limit=5")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
        )
        .await;
        assert_eq!(audit.as_array().unwrap().len(), 2);
        assert_eq!(audit[0]["outcome"], "cache_hit");
    }

    #[tokio::test]
    async fn test_unknown_analysis_is_404() {
        let response = app(OrchestratorSettings::default())
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/analyses/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_zero_capacity_returns_503() {
        let response = app(OrchestratorSettings {
            max_concurrent: 0,
            reserved_priority_slots: 0,
            ..Default::default()
        })
        .oneshot(post_analysis(&sample_request()))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            json_body(response).await["error"]["code"],
            "CAPACITY_EXCEEDED"
        );
    }
}
