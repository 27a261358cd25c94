//! Record store: where completed results are persisted.
//!
//! `PgRecordStore` is used when `DATABASE_URL` is set; otherwise results are
//! kept in process by `InMemoryRecordStore`.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::models::result::AggregatedResult;

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn save(&self, result: &AggregatedResult) -> Result<()>;

    async fn find(&self, analysis_id: Uuid) -> Result<Option<AggregatedResult>>;
}

pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analysis_results (
                id            UUID PRIMARY KEY,
                created_at    TIMESTAMPTZ NOT NULL,
                tier          TEXT NOT NULL,
                depth         TEXT NOT NULL,
                overall_score DOUBLE PRECISION NOT NULL,
                confidence    DOUBLE PRECISION NOT NULL,
                risk_level    TEXT NOT NULL,
                payload       JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create analysis_results table")?;

        info!("analysis_results table ready");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn save(&self, result: &AggregatedResult) -> Result<()> {
        let payload = serde_json::to_value(result).context("Failed to serialize result")?;

        sqlx::query(
            r#"
            INSERT INTO analysis_results
                (id, created_at, tier, depth, overall_score, confidence, risk_level, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(result.request_id)
        .bind(result.timestamp)
        .bind(result.tier.as_str())
        .bind(result.depth.as_str())
        .bind(result.overall_score)
        .bind(result.confidence)
        .bind(result.risk_level.as_str())
        .bind(&payload)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert analysis {}", result.request_id))?;

        Ok(())
    }

    async fn find(&self, analysis_id: Uuid) -> Result<Option<AggregatedResult>> {
        let payload: Option<String> =
            sqlx::query_scalar("SELECT payload::text FROM analysis_results WHERE id = $1")
                .bind(analysis_id)
                .fetch_optional(&self.pool)
                .await?;

        payload
            .map(|json| serde_json::from_str(&json))
            .transpose()
            .with_context(|| format!("Stored payload for {analysis_id} is not a valid result"))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<Uuid, AggregatedResult>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn save(&self, result: &AggregatedResult) -> Result<()> {
        self.records
            .write()
            .await
            .insert(result.request_id, result.clone());
        Ok(())
    }

    async fn find(&self, analysis_id: Uuid) -> Result<Option<AggregatedResult>> {
        Ok(self.records.read().await.get(&analysis_id).cloned())
    }
}
