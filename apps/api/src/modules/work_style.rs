use async_trait::async_trait;

use crate::models::request::AnalysisRequest;
use crate::models::result::ModuleResult;
use crate::modules::{AnalysisModule, ModuleError, ModuleId};
use crate::scoring::resonance::{ResonanceTable, NEUTRAL_RESONANCE};
use crate::scoring::TableError;

const KNOWN_PAIR_CONFIDENCE: f64 = 0.9;
const UNKNOWN_STATE_CONFIDENCE: f64 = 0.4;
const MISSING_STATE_CONFIDENCE: f64 = 0.3;

/// Scores subject vs team work-style resonance. Never fails: missing or
/// unknown styles score neutral with reduced confidence.
pub struct WorkStyleModule {
    table: ResonanceTable,
}

impl WorkStyleModule {
    pub fn new() -> Result<Self, TableError> {
        Ok(Self {
            table: ResonanceTable::work_styles()?,
        })
    }
}

#[async_trait]
impl AnalysisModule for WorkStyleModule {
    fn id(&self) -> ModuleId {
        ModuleId::WorkStyle
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<ModuleResult, ModuleError> {
        let subject_style = request.subject.work_style.as_deref();
        let team_style = request
            .business_context
            .as_ref()
            .and_then(|c| c.team_work_style.as_deref());

        let (Some(subject_style), Some(team_style)) = (subject_style, team_style) else {
            return Ok(
                ModuleResult::new(
                    self.id(),
                    NEUTRAL_RESONANCE * 100.0,
                    MISSING_STATE_CONFIDENCE,
                )
                .with_recommendations(vec![
                    "Record both candidate and team work styles to assess resonance".to_string(),
                ]),
            );
        };

        let resonance = self.table.lookup(subject_style, team_style);
        let confidence = if self.table.contains(subject_style) && self.table.contains(team_style) {
            KNOWN_PAIR_CONFIDENCE
        } else {
            UNKNOWN_STATE_CONFIDENCE
        };

        let mut recommendations = Vec::new();
        let mut risk_factors = Vec::new();
        if resonance < 0.5 {
            recommendations.push(format!(
                "Plan onboarding around the {subject_style}/{team_style} working-style gap"
            ));
        }
        if resonance < 0.4 {
            risk_factors.push(format!(
                "Working-style friction between {subject_style} and {team_style}"
            ));
        }

        Ok(ModuleResult::new(self.id(), resonance * 100.0, confidence)
            .with_recommendations(recommendations)
            .with_risk_factors(risk_factors))
    }
}
