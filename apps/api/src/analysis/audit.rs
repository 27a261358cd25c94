use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::result::AggregatedResult;
use crate::modules::ModuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Completed,
    CacheHit,
    Rejected,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub outcome: AuditOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    pub modules: Vec<ModuleId>,
    pub degraded_modules: Vec<ModuleId>,
    pub duration_ms: u64,
    pub over_budget: bool,
    pub notes: Vec<String>,
}

impl AuditEntry {
    pub fn completed(result: &AggregatedResult, cache_key: Option<String>, notes: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            outcome: AuditOutcome::Completed,
            analysis_id: Some(result.request_id),
            cache_key,
            overall_score: Some(result.overall_score),
            modules: result.modules_used(),
            degraded_modules: result.degraded_modules(),
            duration_ms: result.resource_usage.duration_ms,
            over_budget: result.resource_usage.over_budget,
            notes,
        }
    }

    pub fn cache_hit(result: &AggregatedResult, cache_key: String, notes: Vec<String>) -> Self {
        Self {
            outcome: AuditOutcome::CacheHit,
            cache_key: Some(cache_key),
            modules: Vec::new(),
            degraded_modules: Vec::new(),
            duration_ms: 0,
            over_budget: false,
            ..Self::completed(result, None, notes)
        }
    }

    pub fn rejected(note: String) -> Self {
        Self {
            timestamp: Utc::now(),
            outcome: AuditOutcome::Rejected,
            analysis_id: None,
            cache_key: None,
            overall_score: None,
            modules: Vec::new(),
            degraded_modules: Vec::new(),
            duration_ms: 0,
            over_budget: false,
            notes: vec![note],
        }
    }
}

/// Bounded, append-only log of orchestrations. Oldest entries are dropped
/// once `capacity` is reached.
#[derive(Debug)]
pub struct AuditRecorder {
    capacity: usize,
    entries: RwLock<VecDeque<AuditEntry>>,
}

impl AuditRecorder {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub async fn append(&self, entry: AuditEntry) {
        let mut entries = self.entries.write().await;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Newest first.
    pub async fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
