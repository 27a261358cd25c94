//! Result aggregation: combines module results into one score.
//!
//! Algorithm:
//! 1. healthy results contribute (score, fixed module weight), renormalized
//! 2. overall = Σ(score × weight) / Σ(weight)
//! 3. confidence = weighted mean module confidence × max(0, 1 − stddev/100)
//! 4. risk: high < 40, medium < 60, low otherwise
//! 5. recommendations and risk factors: first-occurrence union, capped

use std::collections::{BTreeMap, HashSet};

use crate::models::result::{ModuleResult, RiskLevel};
use crate::modules::ModuleId;
use crate::scoring::{agreement, weighted_mean};

pub const MAX_RECOMMENDATIONS: usize = 8;
pub const MAX_RISK_FACTORS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub overall_score: f64,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
}

impl Aggregation {
    fn empty() -> Self {
        Self {
            overall_score: 0.0,
            confidence: 0.0,
            risk_level: RiskLevel::High,
            recommendations: Vec::new(),
            risk_factors: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultAggregator {
    max_recommendations: usize,
    max_risk_factors: usize,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self {
            max_recommendations: MAX_RECOMMENDATIONS,
            max_risk_factors: MAX_RISK_FACTORS,
        }
    }
}

impl ResultAggregator {
    pub fn combine(&self, module_results: &BTreeMap<ModuleId, ModuleResult>) -> Aggregation {
        let healthy: Vec<&ModuleResult> =
            module_results.values().filter(|r| r.is_healthy()).collect();

        let Some(overall_score) =
            weighted_mean(healthy.iter().map(|r| (r.score, r.module_id.weight())))
        else {
            return Aggregation {
                risk_factors: degraded_notes(module_results)
                    .take(self.max_risk_factors)
                    .collect(),
                ..Aggregation::empty()
            };
        };

        let mean_confidence =
            weighted_mean(healthy.iter().map(|r| (r.confidence, r.module_id.weight())))
                .unwrap_or(0.0);
        let scores: Vec<f64> = healthy.iter().map(|r| r.score).collect();
        let confidence = (mean_confidence * agreement(&scores)).clamp(0.0, 1.0);

        let recommendations = dedup_capped(
            healthy.iter().flat_map(|r| r.recommendations.iter().cloned()),
            self.max_recommendations,
        );
        let risk_factors = dedup_capped(
            healthy
                .iter()
                .flat_map(|r| r.risk_factors.iter().cloned())
                .chain(degraded_notes(module_results)),
            self.max_risk_factors,
        );

        Aggregation {
            overall_score,
            confidence,
            risk_level: RiskLevel::from_score(overall_score),
            recommendations,
            risk_factors,
        }
    }
}

fn degraded_notes(
    module_results: &BTreeMap<ModuleId, ModuleResult>,
) -> impl Iterator<Item = String> + '_ {
    module_results
        .values()
        .filter(|r| !r.is_healthy())
        .map(|r| format!("{} analysis unavailable", r.module_id))
}

fn dedup_capped(items: impl Iterator<Item = String>, cap: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .filter(|item| seen.insert(item.clone()))
        .take(cap)
        .collect()
}
