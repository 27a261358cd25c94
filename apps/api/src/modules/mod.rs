//! Analysis modules: pluggable, trait-based analyzers run by the orchestrator.
//!
//! Every module implements [`AnalysisModule`]. The orchestrator holds them as
//! `Arc<dyn AnalysisModule>` keyed by [`ModuleId`], so new scoring domains can be
//! added without touching orchestration code.

pub mod dimension;
pub mod fairness;
pub mod work_style;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::request::AnalysisRequest;
use crate::models::result::ModuleResult;
use crate::scoring::TableError;

use self::dimension::DimensionModule;
use self::fairness::FairnessAuditModule;
use self::work_style::WorkStyleModule;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleId {
    Compatibility,
    WorkStyle,
    RetentionRisk,
    MarketAlignment,
    GrowthTrajectory,
    FairnessAudit,
}

impl ModuleId {
    #[cfg(test)]
    pub const ALL: [ModuleId; 6] = [
        ModuleId::Compatibility,
        ModuleId::WorkStyle,
        ModuleId::RetentionRisk,
        ModuleId::MarketAlignment,
        ModuleId::GrowthTrajectory,
        ModuleId::FairnessAudit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compatibility => "compatibility",
            Self::WorkStyle => "work_style",
            Self::RetentionRisk => "retention_risk",
            Self::MarketAlignment => "market_alignment",
            Self::GrowthTrajectory => "growth_trajectory",
            Self::FairnessAudit => "fairness_audit",
        }
    }

    /// Fixed aggregation weight. Sums to 1.0 across all modules; the aggregator
    /// renormalizes over the modules actually present.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Compatibility => 0.25,
            Self::WorkStyle => 0.20,
            Self::RetentionRisk => 0.15,
            Self::MarketAlignment => 0.15,
            Self::GrowthTrajectory => 0.15,
            Self::FairnessAudit => 0.10,
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("{0}")]
    Failed(String),
}

/// The analysis module trait. Implement this to add a scoring domain.
#[async_trait]
pub trait AnalysisModule: Send + Sync {
    fn id(&self) -> ModuleId;

    async fn run(&self, request: &AnalysisRequest) -> Result<ModuleResult, ModuleError>;
}

pub type ModuleSet = HashMap<ModuleId, Arc<dyn AnalysisModule>>;

/// Builds every built-in module. Fails only if a hand-authored table is invalid.
pub fn default_modules() -> Result<ModuleSet, TableError> {
    let modules: Vec<Arc<dyn AnalysisModule>> = vec![
        Arc::new(DimensionModule::compatibility()?),
        Arc::new(WorkStyleModule::new()?),
        Arc::new(DimensionModule::retention_risk()?),
        Arc::new(DimensionModule::market_alignment()?),
        Arc::new(DimensionModule::growth_trajectory()?),
        Arc::new(FairnessAuditModule::default()),
    ];

    Ok(modules.into_iter().map(|m| (m.id(), m)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_weights_sum_to_one() {
        let sum: f64 = ModuleId::ALL.iter().map(ModuleId::weight).sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum was {sum}");
    }

    #[test]
    fn test_default_modules_cover_every_id() {
        let modules = default_modules().unwrap();
        for id in ModuleId::ALL {
            assert_eq!(modules.get(&id).map(|m| m.id()), Some(id));
        }
    }

    #[test]
    fn test_module_id_serializes_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&ModuleId::RetentionRisk).unwrap(),
            "\"retention_risk\""
        );
        assert_eq!(ModuleId::WorkStyle.to_string(), "work_style");
    }
}
