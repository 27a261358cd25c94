//! Weighted dimension modules.
//!
//! Each module owns a [`DimensionWeightResolver`]; the request is classified
//! into a bucket and the subject's declared dimension scores are combined with
//! that bucket's weights.
//!
//! Algorithm:
//! 1. classify title/description/industry → bucket weights
//! 2. score = Σ(score × weight) / Σ(weight) over dimensions present
//! 3. confidence = share of the bucket's weight actually covered
//! 4. dimensions under 50 → recommendation, under 40 → risk factor

use async_trait::async_trait;
use tracing::debug;

use crate::models::request::AnalysisRequest;
use crate::models::result::ModuleResult;
use crate::modules::{AnalysisModule, ModuleError, ModuleId};
use crate::scoring::weights::{score_dimensions, ContextBucket, DimensionWeightResolver};
use crate::scoring::{clamp_score, TableError};

const RECOMMEND_BELOW: f64 = 50.0;
const RISK_BELOW: f64 = 40.0;

pub struct DimensionModule {
    id: ModuleId,
    resolver: DimensionWeightResolver,
}

impl DimensionModule {
    pub fn new(id: ModuleId, resolver: DimensionWeightResolver) -> Self {
        Self { id, resolver }
    }

    #[cfg(test)]
    pub fn resolver(&self) -> &DimensionWeightResolver {
        &self.resolver
    }

    /// Role-family compatibility across skills, experience, culture, growth, stability.
    pub fn compatibility() -> Result<Self, TableError> {
        let resolver = DimensionWeightResolver::new(
            vec![
                ContextBucket::new(
                    "leadership",
                    &["director", "head of", "vp", "vice president", "manager", "lead"],
                    &[
                        ("skills", 0.20),
                        ("experience", 0.30),
                        ("culture", 0.25),
                        ("growth", 0.10),
                        ("stability", 0.15),
                    ],
                ),
                ContextBucket::new(
                    "engineering",
                    &["engineer", "developer", "software", "devops", "data scien", "architect"],
                    &[
                        ("skills", 0.40),
                        ("experience", 0.25),
                        ("culture", 0.15),
                        ("growth", 0.15),
                        ("stability", 0.05),
                    ],
                ),
                ContextBucket::new(
                    "sales",
                    &["sales", "account", "business development", "customer success"],
                    &[
                        ("skills", 0.25),
                        ("experience", 0.20),
                        ("culture", 0.25),
                        ("growth", 0.10),
                        ("stability", 0.20),
                    ],
                ),
                ContextBucket::new(
                    "creative",
                    &["design", "writer", "content", "brand", "creative"],
                    &[
                        ("skills", 0.35),
                        ("experience", 0.15),
                        ("culture", 0.25),
                        ("growth", 0.20),
                        ("stability", 0.05),
                    ],
                ),
            ],
            &[
                ("skills", 0.30),
                ("experience", 0.25),
                ("culture", 0.20),
                ("growth", 0.15),
                ("stability", 0.10),
            ],
        )?;
        Ok(Self::new(ModuleId::Compatibility, resolver))
    }

    pub fn retention_risk() -> Result<Self, TableError> {
        let resolver = DimensionWeightResolver::uniform(&[
            ("stability", 0.40),
            ("engagement", 0.35),
            ("growth", 0.25),
        ])?;
        Ok(Self::new(ModuleId::RetentionRisk, resolver))
    }

    pub fn market_alignment() -> Result<Self, TableError> {
        let resolver = DimensionWeightResolver::new(
            vec![
                ContextBucket::new(
                    "finance",
                    &["fintech", "finance", "bank", "insurance"],
                    &[("demand", 0.35), ("compensation", 0.45), ("location", 0.20)],
                ),
                ContextBucket::new(
                    "startup",
                    &["startup", "seed", "series a", "series b"],
                    &[("demand", 0.50), ("compensation", 0.20), ("location", 0.30)],
                ),
            ],
            &[("demand", 0.45), ("compensation", 0.35), ("location", 0.20)],
        )?;
        Ok(Self::new(ModuleId::MarketAlignment, resolver))
    }

    pub fn growth_trajectory() -> Result<Self, TableError> {
        let resolver = DimensionWeightResolver::uniform(&[
            ("learning", 0.40),
            ("growth", 0.35),
            ("leadership", 0.25),
        ])?;
        Ok(Self::new(ModuleId::GrowthTrajectory, resolver))
    }
}

#[async_trait]
impl AnalysisModule for DimensionModule {
    fn id(&self) -> ModuleId {
        self.id
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<ModuleResult, ModuleError> {
        let bucket = self.resolver.classify(&request.classification_text());
        let weights = bucket.weights();
        let scores = &request.subject.dimension_scores;

        let scored = score_dimensions(scores, weights).ok_or_else(|| {
            ModuleError::MissingInput(format!(
                "{} needs at least one of: {}",
                self.id,
                weights.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })?;

        debug!(
            module = %self.id,
            bucket = %bucket.name,
            score = scored.score,
            coverage = scored.coverage,
            "Dimension score computed"
        );

        // heaviest dimensions first
        let mut ranked: Vec<(&String, &f64)> = weights.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));

        let mut recommendations = Vec::new();
        let mut risk_factors = Vec::new();
        for (dimension, weight) in ranked {
            match scores.get(dimension).copied().map(clamp_score) {
                Some(score) if score < RECOMMEND_BELOW => {
                    recommendations.push(format!(
                        "Strengthen {dimension} ({score:.0}/100); it carries {:.0}% of the {} {} weighting",
                        weight * 100.0,
                        bucket.name,
                        self.id
                    ));
                    if score < RISK_BELOW {
                        risk_factors.push(format!("Low {dimension} score ({score:.0}/100)"));
                    }
                }
                Some(_) => {}
                None => recommendations.push(format!(
                    "Provide a score for {dimension} to raise {} confidence",
                    self.id
                )),
            }
        }

        Ok(ModuleResult::new(self.id, scored.score, scored.coverage)
            .with_recommendations(recommendations)
            .with_risk_factors(risk_factors))
    }
}
