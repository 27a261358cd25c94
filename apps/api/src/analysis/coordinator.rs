//! Execution coordinator: concurrent fan-out to modules, fan-in of results.
//!
//! Every module invocation yields a tagged [`ModuleOutcome`]. Failures of any
//! kind (module error, panic, missing registration, deadline) are converted to
//! a degraded [`ModuleResult`] here, so one module can never abort the batch.
//!
//! The timeout is advisory: it is compared after all tasks finish and only
//! flags the run. A deadline is checked when a task starts; a module already
//! running is never interrupted.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::models::request::AnalysisRequest;
use crate::models::result::ModuleResult;
use crate::modules::{ModuleError, ModuleId, ModuleSet};

#[derive(Debug, Error)]
pub enum ModuleFailure {
    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error("module panicked: {0}")]
    Panicked(String),

    #[error("module task was cancelled")]
    Cancelled,

    #[error("module '{0}' is not registered")]
    NotRegistered(ModuleId),

    #[error("skipped: deadline passed before the module started")]
    DeadlineExceeded,
}

pub type ModuleOutcome = Result<ModuleResult, ModuleFailure>;

#[derive(Debug, Clone)]
pub struct ExecutionReport {
    pub results: BTreeMap<ModuleId, ModuleResult>,
    pub elapsed: Duration,
    pub over_budget: bool,
}

pub struct ExecutionCoordinator {
    modules: ModuleSet,
    timeout: Duration,
}

impl ExecutionCoordinator {
    pub fn new(modules: ModuleSet, timeout: Duration) -> Self {
        Self { modules, timeout }
    }

    /// Runs every module in `module_ids` concurrently and waits for all of them.
    pub async fn run(
        &self,
        request: Arc<AnalysisRequest>,
        module_ids: &[ModuleId],
        deadline: Option<Instant>,
    ) -> ExecutionReport {
        let started = Instant::now();

        let tasks = module_ids.iter().map(|&id| {
            let module = self.modules.get(&id).cloned();
            let request = Arc::clone(&request);
            let handle = tokio::spawn(async move {
                let module = module.ok_or(ModuleFailure::NotRegistered(id))?;
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return Err(ModuleFailure::DeadlineExceeded);
                }
                module.run(&request).await.map_err(ModuleFailure::from)
            });
            async move { (id, flatten_join(handle.await)) }
        });

        let results = join_all(tasks)
            .await
            .into_iter()
            .map(|(id, outcome)| (id, into_module_result(id, outcome)))
            .collect::<BTreeMap<_, _>>();

        let elapsed = started.elapsed();
        let over_budget = elapsed > self.timeout;
        if over_budget {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                timeout_ms = self.timeout.as_millis() as u64,
                "Module execution exceeded its time budget"
            );
        }

        ExecutionReport {
            results,
            elapsed,
            over_budget,
        }
    }
}

fn flatten_join(joined: Result<ModuleOutcome, JoinError>) -> ModuleOutcome {
    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ModuleFailure::Panicked(message))
        }
        Err(_) => Err(ModuleFailure::Cancelled),
    }
}

/// The boundary where failures become degraded results.
fn into_module_result(id: ModuleId, outcome: ModuleOutcome) -> ModuleResult {
    match outcome {
        Ok(result) if result.module_id == id => {
            debug!(module = %id, score = result.score, "Module completed");
            result
        }
        Ok(result) => {
            warn!(
                module = %id,
                reported = %result.module_id,
                "Module reported a different id; keeping the dispatched one"
            );
            ModuleResult { module_id: id, ..result }
        }
        Err(failure) => {
            warn!(module = %id, error = %failure, "Module failed, degrading result");
            ModuleResult::degraded(id, failure.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    use crate::models::request::{AnalysisDepth, ServiceTier, SubjectRecord};
    use crate::modules::AnalysisModule;

    struct Fixed(ModuleId, f64);

    #[async_trait]
    impl AnalysisModule for Fixed {
        fn id(&self) -> ModuleId {
            self.0
        }

        async fn run(&self, _request: &AnalysisRequest) -> Result<ModuleResult, ModuleError> {
            Ok(ModuleResult::new(self.0, self.1, 0.8))
        }
    }

    struct Failing(ModuleId);

    #[async_trait]
    impl AnalysisModule for Failing {
        fn id(&self) -> ModuleId {
            self.0
        }

        async fn run(&self, _request: &AnalysisRequest) -> Result<ModuleResult, ModuleError> {
            Err(ModuleError::Failed("upstream unavailable".to_string()))
        }
    }

    struct Panicking(ModuleId);

    #[async_trait]
    impl AnalysisModule for Panicking {
        fn id(&self) -> ModuleId {
            self.0
        }

        async fn run(&self, _request: &AnalysisRequest) -> Result<ModuleResult, ModuleError> {
            panic!("index out of range")
        }
    }

    struct Slow(ModuleId, Duration);

    #[async_trait]
    impl AnalysisModule for Slow {
        fn id(&self) -> ModuleId {
            self.0
        }

        async fn run(&self, _request: &AnalysisRequest) -> Result<ModuleResult, ModuleError> {
            tokio::time::sleep(self.1).await;
            Ok(ModuleResult::new(self.0, 70.0, 0.7))
        }
    }

    fn request() -> Arc<AnalysisRequest> {
        Arc::new(AnalysisRequest::new(
            SubjectRecord::default(),
            ServiceTier::Enterprise,
            AnalysisDepth::Deep,
        ))
    }

    fn modules(list: Vec<Arc<dyn AnalysisModule>>) -> ModuleSet {
        list.into_iter().map(|m| (m.id(), m)).collect::<HashMap<_, _>>()
    }

    #[tokio::test]
    async fn test_failure_and_panic_are_isolated() {
        let coordinator = ExecutionCoordinator::new(
            modules(vec![
                Arc::new(Fixed(ModuleId::Compatibility, 80.0)),
                Arc::new(Failing(ModuleId::WorkStyle)),
                Arc::new(Panicking(ModuleId::RetentionRisk)),
            ]),
            Duration::from_secs(5),
        );
        let ids = [
            ModuleId::Compatibility,
            ModuleId::WorkStyle,
            ModuleId::RetentionRisk,
        ];

        let report = coordinator.run(request(), &ids, None).await;

        assert_eq!(report.results.len(), 3);
        assert_eq!(report.results[&ModuleId::Compatibility].score, 80.0);

        let failed = &report.results[&ModuleId::WorkStyle];
        assert_eq!(failed.score, 0.0);
        assert_eq!(failed.error.as_deref(), Some("upstream unavailable"));

        let panicked = &report.results[&ModuleId::RetentionRisk];
        assert_eq!(panicked.score, 0.0);
        assert!(panicked.error.as_deref().unwrap().contains("index out of range"));
    }

    #[tokio::test]
    async fn test_unregistered_module_is_degraded() {
        let coordinator = ExecutionCoordinator::new(ModuleSet::new(), Duration::from_secs(5));
        let report = coordinator
            .run(request(), &[ModuleId::FairnessAudit], None)
            .await;

        let result = &report.results[&ModuleId::FairnessAudit];
        assert!(!result.is_healthy());
        assert!(result.error.as_deref().unwrap().contains("not registered"));
    }

    #[tokio::test]
    async fn test_passed_deadline_skips_modules() {
        let coordinator = ExecutionCoordinator::new(
            modules(vec![Arc::new(Fixed(ModuleId::Compatibility, 90.0))]),
            Duration::from_secs(5),
        );
        let report = coordinator
            .run(request(), &[ModuleId::Compatibility], Some(Instant::now()))
            .await;

        let result = &report.results[&ModuleId::Compatibility];
        assert_eq!(result.score, 0.0);
        assert!(result.error.as_deref().unwrap().contains("deadline"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_budget_is_flagged_not_truncated() {
        let coordinator = ExecutionCoordinator::new(
            modules(vec![Arc::new(Slow(
                ModuleId::Compatibility,
                Duration::from_millis(250),
            ))]),
            Duration::from_millis(100),
        );
        let report = coordinator
            .run(request(), &[ModuleId::Compatibility], None)
            .await;

        assert!(report.over_budget);
        assert!(report.results[&ModuleId::Compatibility].is_healthy());
        assert_eq!(report.results[&ModuleId::Compatibility].score, 70.0);
    }
}
