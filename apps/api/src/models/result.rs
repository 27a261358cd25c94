use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::request::{AnalysisDepth, ServiceTier};
use crate::modules::ModuleId;

/// Output of one module for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleResult {
    pub module_id: ModuleId,
    /// 0–100. Zero for degraded results.
    pub score: f64,
    /// 0–1.
    pub confidence: f64,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ModuleResult {
    pub fn new(module_id: ModuleId, score: f64, confidence: f64) -> Self {
        Self {
            module_id,
            score: score.clamp(0.0, 100.0),
            confidence: confidence.clamp(0.0, 1.0),
            recommendations: Vec::new(),
            risk_factors: Vec::new(),
            error: None,
        }
    }

    pub fn with_recommendations(mut self, recommendations: Vec<String>) -> Self {
        self.recommendations = recommendations;
        self
    }

    pub fn with_risk_factors(mut self, risk_factors: Vec<String>) -> Self {
        self.risk_factors = risk_factors;
        self
    }

    /// Stand-in for a module that failed, so the batch can still complete.
    pub fn degraded(module_id: ModuleId, reason: impl Into<String>) -> Self {
        Self {
            module_id,
            score: 0.0,
            confidence: 0.0,
            recommendations: Vec::new(),
            risk_factors: Vec::new(),
            error: Some(reason.into()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// high < 40 ≤ medium < 60 ≤ low
    pub fn from_score(overall_score: f64) -> Self {
        if overall_score < 40.0 {
            Self::High
        } else if overall_score < 60.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsage {
    pub duration_ms: u64,
    pub modules_executed: usize,
    /// Set when module execution ran past the configured timeout.
    #[serde(default)]
    pub over_budget: bool,
}

/// Final result of one orchestration. Written once, then only read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub tier: ServiceTier,
    pub depth: AnalysisDepth,
    pub overall_score: f64,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    pub module_results: BTreeMap<ModuleId, ModuleResult>,
    pub resource_usage: ResourceUsage,
}

impl AggregatedResult {
    pub fn modules_used(&self) -> Vec<ModuleId> {
        self.module_results.keys().copied().collect()
    }

    pub fn degraded_modules(&self) -> Vec<ModuleId> {
        self.module_results
            .values()
            .filter(|r| !r.is_healthy())
            .map(|r| r.module_id)
            .collect()
    }
}

/// Outbound response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub analysis_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub overall_score: f64,
    pub confidence: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    pub modules_used: Vec<ModuleId>,
    pub degraded_modules: Vec<ModuleId>,
    pub resource_usage: ResourceUsage,
    pub cached: bool,
}

impl AnalysisResponse {
    pub fn from_result(result: &AggregatedResult, cached: bool) -> Self {
        Self {
            analysis_id: result.request_id,
            timestamp: result.timestamp,
            overall_score: result.overall_score,
            confidence: result.confidence,
            risk_level: result.risk_level,
            recommendations: result.recommendations.clone(),
            risk_factors: result.risk_factors.clone(),
            modules_used: result.modules_used(),
            degraded_modules: result.degraded_modules(),
            resource_usage: result.resource_usage,
            cached,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::ResultAggregator;

    #[test]
    fn test_risk_level_thresholds() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(39.9), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(40.0), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(59.9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(60.0), RiskLevel::Low);
    }

    #[test]
    fn test_module_result_clamps_score_and_confidence() {
        let result = ModuleResult::new(ModuleId::Compatibility, 140.0, -0.5);
        assert_eq!(result.score, 100.0);
        assert_eq!(result.confidence, 0.0);
        assert!(result.is_healthy());
    }

    #[test]
    fn test_degraded_result_has_zero_score_and_error() {
        let result = ModuleResult::degraded(ModuleId::WorkStyle, "boom");
        assert_eq!(result.score, 0.0);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert!(!result.is_healthy());
    }

    #[test]
    fn test_response_uses_camel_case_wire_names() {
        let mut module_results = BTreeMap::new();
        module_results.insert(
            ModuleId::Compatibility,
            ModuleResult::new(ModuleId::Compatibility, 72.0, 0.8),
        );
        let result = AggregatedResult {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            tier: ServiceTier::Basic,
            depth: AnalysisDepth::Basic,
            overall_score: 72.0,
            confidence: 0.8,
            risk_level: RiskLevel::Low,
            recommendations: vec![],
            risk_factors: vec![],
            module_results,
            resource_usage: ResourceUsage {
                duration_ms: 3,
                modules_executed: 1,
                over_budget: false,
            },
        };

        let json = serde_json::to_value(AnalysisResponse::from_result(&result, false)).unwrap();
        assert_eq!(json["riskLevel"], "low");
        assert_eq!(json["modulesUsed"][0], "compatibility");
        assert_eq!(json["resourceUsage"]["durationMs"], 3);
        assert_eq!(json["resourceUsage"]["modulesExecuted"], 1);
        assert_eq!(json["analysisId"], result.request_id.to_string());
    }

    #[test]
    fn test_aggregated_result_survives_json_text() {
        let mut module_results = BTreeMap::new();
        module_results.insert(
            ModuleId::FairnessAudit,
            ModuleResult::degraded(ModuleId::FairnessAudit, "missing input"),
        );
        let result = AggregatedResult {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            tier: ServiceTier::Enterprise,
            depth: AnalysisDepth::Deep,
            overall_score: 0.0,
            confidence: 0.0,
            risk_level: RiskLevel::High,
            recommendations: vec![],
            risk_factors: vec![],
            module_results,
            resource_usage: ResourceUsage {
                duration_ms: 0,
                modules_executed: 1,
                over_budget: false,
            },
        };

        let text = serde_json::to_string(&result).unwrap();
        let recovered: AggregatedResult = serde_json::from_str(&text).unwrap();
        assert_eq!(recovered, result);
    }

    #[test]
    fn test_computed_scores_survive_json_text_bit_for_bit() {
        let aggregator = ResultAggregator::default();
        let combine = |a: f64, b: f64, c: f64| {
            let results: BTreeMap<ModuleId, ModuleResult> = [
                ModuleResult::new(ModuleId::Compatibility, a, 0.9),
                ModuleResult::new(ModuleId::WorkStyle, b, 0.7),
                ModuleResult::new(ModuleId::RetentionRisk, c, 0.8),
            ]
            .into_iter()
            .map(|r| (r.module_id, r))
            .collect();
            aggregator.combine(&results)
        };

        let mut pairs = Vec::new();
        for a in 0..=100 {
            for b in 0..=100 {
                let aggregation = combine(a as f64, b as f64, 37.0);
                pairs.push((aggregation.overall_score, aggregation.confidence));
            }
        }
        let text = serde_json::to_string(&pairs).unwrap();
        let recovered: Vec<(f64, f64)> = serde_json::from_str(&text).unwrap();
        let drifted = pairs
            .iter()
            .zip(&recovered)
            .filter(|(orig, back)| {
                orig.0.to_bits() != back.0.to_bits() || orig.1.to_bits() != back.1.to_bits()
            })
            .count();
        assert_eq!(drifted, 0, "{drifted} aggregates changed after a JSON round trip");

        let aggregation = combine(13.0, 41.0, 7.0);
        let result = AggregatedResult {
            request_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            tier: ServiceTier::Pro,
            depth: AnalysisDepth::Standard,
            overall_score: aggregation.overall_score,
            confidence: aggregation.confidence,
            risk_level: aggregation.risk_level,
            recommendations: aggregation.recommendations,
            risk_factors: aggregation.risk_factors,
            module_results: BTreeMap::new(),
            resource_usage: ResourceUsage {
                duration_ms: 4,
                modules_executed: 3,
                over_budget: false,
            },
        };
        let recovered: AggregatedResult =
            serde_json::from_str(&serde_json::to_string(&result).unwrap()).unwrap();
        assert_eq!(recovered, result);
    }
}
