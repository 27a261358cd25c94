//! Orchestrator: the single entry point for running an analysis.
//!
//! Pipeline:
//! 1. admission: `limiter.try_acquire(priority)`, rejected when full
//! 2. cache lookup by content hash; a hit returns the stored result unchanged
//! 3. registry resolves (tier, depth) to the module set
//! 4. coordinator fans out, every module yields a result (degraded on failure)
//! 5. aggregator combines module results into one score
//! 6. cache put, record store save (both best-effort)
//! 7. audit append, permit released on return

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::aggregator::ResultAggregator;
use crate::analysis::audit::{AuditEntry, AuditRecorder};
use crate::analysis::cache::{CacheKey, ResultCache};
use crate::analysis::coordinator::ExecutionCoordinator;
use crate::analysis::limiter::ConcurrencyLimiter;
use crate::analysis::registry::ModuleRegistry;
use crate::analysis::store::RecordStore;
use crate::config::Config;
use crate::models::request::AnalysisRequest;
use crate::models::result::{AggregatedResult, ResourceUsage};
use crate::modules::ModuleSet;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("analysis capacity exceeded ({in_flight}/{max_concurrent} in flight), retry later")]
    CapacityExceeded {
        in_flight: usize,
        max_concurrent: usize,
    },
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub max_concurrent: usize,
    pub reserved_priority_slots: usize,
    pub cache_ttl: Duration,
    pub module_timeout: Duration,
    pub audit_capacity: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 16,
            reserved_priority_slots: 1,
            cache_ttl: Duration::from_secs(30 * 60),
            module_timeout: Duration::from_secs(5),
            audit_capacity: 1000,
        }
    }
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_concurrent: config.max_concurrent_analyses,
            reserved_priority_slots: config.reserved_priority_slots,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            module_timeout: Duration::from_millis(config.module_timeout_ms),
            audit_capacity: config.audit_capacity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub result: AggregatedResult,
    pub cache_hit: bool,
}

pub struct Orchestrator {
    registry: ModuleRegistry,
    coordinator: ExecutionCoordinator,
    aggregator: ResultAggregator,
    cache: Arc<dyn ResultCache>,
    store: Arc<dyn RecordStore>,
    limiter: ConcurrencyLimiter,
    audit: AuditRecorder,
    cache_ttl: Duration,
}

impl Orchestrator {
    pub fn new(
        modules: ModuleSet,
        cache: Arc<dyn ResultCache>,
        store: Arc<dyn RecordStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            registry: ModuleRegistry::default(),
            coordinator: ExecutionCoordinator::new(modules, settings.module_timeout),
            aggregator: ResultAggregator::default(),
            cache,
            store,
            limiter: ConcurrencyLimiter::new(
                settings.max_concurrent,
                settings.reserved_priority_slots,
            ),
            audit: AuditRecorder::new(settings.audit_capacity),
            cache_ttl: settings.cache_ttl,
        }
    }

    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome, AnalysisError> {
        self.analyze_until(request, None).await
    }

    /// Like [`analyze`](Self::analyze), but modules that have not started by
    /// `deadline` are skipped and reported as degraded.
    pub async fn analyze_until(
        &self,
        request: AnalysisRequest,
        deadline: Option<Instant>,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let started = Instant::now();

        let Some(_permit) = self.limiter.try_acquire(request.priority) else {
            let in_flight = self.limiter.in_flight();
            let max_concurrent = self.limiter.max_concurrent();
            warn!(
                in_flight,
                max_concurrent,
                priority = request.priority.value(),
                "Analysis rejected: at capacity"
            );
            self.audit
                .append(AuditEntry::rejected(format!(
                    "capacity exceeded at {in_flight}/{max_concurrent} (priority {})",
                    request.priority.value()
                )))
                .await;
            return Err(AnalysisError::CapacityExceeded {
                in_flight,
                max_concurrent,
            });
        };

        let mut notes = Vec::new();
        if request.tier_fallback {
            notes.push("unrecognized tier or depth, normalized to basic/basic".to_string());
        }

        let cache_key = match CacheKey::for_request(&request) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "Could not derive cache key, skipping cache");
                notes.push(format!("cache skipped: {e}"));
                None
            }
        };

        if let Some(key) = &cache_key {
            match self.cache.get(key).await {
                Ok(Some(cached)) => {
                    info!(
                        analysis_id = %cached.request_id,
                        cache_key = %key,
                        "Cache hit"
                    );
                    self.audit
                        .append(AuditEntry::cache_hit(&cached, key.to_string(), notes))
                        .await;
                    return Ok(AnalysisOutcome {
                        result: cached,
                        cache_hit: true,
                    });
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, cache_key = %key, "Cache unavailable, treating as miss");
                    notes.push(format!("cache unavailable: {e}"));
                }
            }
        }

        let module_ids = self.registry.resolve(request.tier, request.depth);
        let request_id = Uuid::new_v4();
        info!(
            analysis_id = %request_id,
            tier = request.tier.as_str(),
            depth = request.depth.as_str(),
            modules = module_ids.len(),
            "Running analysis"
        );

        let tier = request.tier;
        let depth = request.depth;
        let report = self
            .coordinator
            .run(Arc::new(request), &module_ids, deadline)
            .await;
        let aggregation = self.aggregator.combine(&report.results);

        let result = AggregatedResult {
            request_id,
            timestamp: Utc::now(),
            tier,
            depth,
            overall_score: aggregation.overall_score,
            confidence: aggregation.confidence,
            risk_level: aggregation.risk_level,
            recommendations: aggregation.recommendations,
            risk_factors: aggregation.risk_factors,
            resource_usage: ResourceUsage {
                duration_ms: started.elapsed().as_millis() as u64,
                modules_executed: report.results.len(),
                over_budget: report.over_budget,
            },
            module_results: report.results,
        };

        if let Some(key) = &cache_key {
            if let Err(e) = self.cache.put(key, &result, self.cache_ttl).await {
                warn!(error = %e, cache_key = %key, "Failed to cache result");
                notes.push(format!("cache write failed: {e}"));
            }
        }

        if let Err(e) = self.store.save(&result).await {
            warn!(analysis_id = %request_id, error = %e, "Failed to persist result");
            notes.push(format!("persistence failed: {e}"));
        }

        info!(
            analysis_id = %request_id,
            overall_score = result.overall_score,
            confidence = result.confidence,
            risk_level = result.risk_level.as_str(),
            duration_ms = result.resource_usage.duration_ms,
            "Analysis complete"
        );

        self.audit
            .append(AuditEntry::completed(
                &result,
                cache_key.map(|k| k.to_string()),
                notes,
            ))
            .await;

        Ok(AnalysisOutcome {
            result,
            cache_hit: false,
        })
    }

    /// Drops any cached result for `request`, forcing the next identical
    /// request to run its modules.
    pub async fn invalidate(&self, request: &AnalysisRequest) -> anyhow::Result<CacheKey> {
        let key = CacheKey::for_request(request)?;
        self.cache.evict(&key).await?;
        info!(cache_key = %key, "Cache entry evicted");
        Ok(key)
    }

    /// Looks up a previously completed analysis in the record store.
    pub async fn find(&self, analysis_id: Uuid) -> anyhow::Result<Option<AggregatedResult>> {
        self.store.find(analysis_id).await
    }

    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }
}
