//! Fairness audit: flags inconsistent evaluations and protected attributes.
//!
//! score = 100 − 2·stddev(dimension scores) − 15 per protected attribute present

use async_trait::async_trait;

use crate::models::request::AnalysisRequest;
use crate::models::result::ModuleResult;
use crate::modules::{AnalysisModule, ModuleError, ModuleId};
use crate::scoring::population_std_dev;

const PROTECTED_ATTRIBUTES: &[&str] = &[
    "age",
    "gender",
    "ethnicity",
    "race",
    "religion",
    "maritalStatus",
    "disability",
    "nationality",
];

const DISPERSION_PENALTY: f64 = 2.0;
const PROTECTED_ATTRIBUTE_PENALTY: f64 = 15.0;
/// Max − min spread above which evaluators are asked to reconcile.
const SPREAD_WARNING: f64 = 40.0;

pub struct FairnessAuditModule {
    protected: Vec<String>,
}

impl Default for FairnessAuditModule {
    fn default() -> Self {
        Self {
            protected: PROTECTED_ATTRIBUTES.iter().map(|a| a.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl AnalysisModule for FairnessAuditModule {
    fn id(&self) -> ModuleId {
        ModuleId::FairnessAudit
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<ModuleResult, ModuleError> {
        let scores: Vec<f64> = request.subject.dimension_scores.values().copied().collect();
        if scores.len() < 2 {
            return Err(ModuleError::MissingInput(
                "fairness audit needs at least two dimension scores".to_string(),
            ));
        }

        let std_dev = population_std_dev(&scores);
        let spread = scores.iter().copied().fold(f64::MIN, f64::max)
            - scores.iter().copied().fold(f64::MAX, f64::min);

        let flagged: Vec<&String> = request
            .subject
            .attributes
            .keys()
            .filter(|key| self.protected.contains(&key.to_lowercase()))
            .collect();

        let mut recommendations = Vec::new();
        let mut risk_factors = Vec::new();

        if spread > SPREAD_WARNING {
            recommendations.push(format!(
                "Reconcile dimension scores: they span {spread:.0} points"
            ));
            risk_factors.push("Inconsistent evaluation across dimensions".to_string());
        }
        for attribute in &flagged {
            risk_factors.push(format!("Protected attribute '{attribute}' present in subject record"));
        }
        if !flagged.is_empty() {
            recommendations
                .push("Remove protected attributes before using this analysis in decisions".to_string());
        }

        let score = 100.0
            - DISPERSION_PENALTY * std_dev
            - PROTECTED_ATTRIBUTE_PENALTY * flagged.len() as f64;
        // more dimensions → more evidence, saturating at five
        let confidence = (scores.len() as f64 / 5.0).min(1.0);

        Ok(ModuleResult::new(self.id(), score, confidence)
            .with_recommendations(recommendations)
            .with_risk_factors(risk_factors))
    }
}
