//! Context-dependent dimension weighting.
//!
//! A record is classified into a bucket by case-insensitive keyword match; the
//! first matching bucket wins and unmatched records use the default bucket.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::scoring::{clamp_score, weighted_mean, TableError};

pub type WeightMap = BTreeMap<String, f64>;

pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;
pub const DEFAULT_BUCKET: &str = "default";

#[derive(Debug, Clone)]
pub struct ContextBucket {
    pub name: String,
    keywords: Vec<String>,
    weights: WeightMap,
}

impl ContextBucket {
    pub fn new(name: &str, keywords: &[&str], weights: &[(&str, f64)]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            weights: weights
                .iter()
                .map(|(dimension, weight)| (dimension.to_string(), *weight))
                .collect(),
        }
    }

    pub fn weights(&self) -> &WeightMap {
        &self.weights
    }

    fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }

    fn validate(&self) -> Result<(), TableError> {
        if let Some((dimension, _)) = self.weights.iter().find(|(_, w)| **w < 0.0) {
            return Err(TableError::NegativeWeight {
                bucket: self.name.clone(),
                dimension: dimension.clone(),
            });
        }
        let sum: f64 = self.weights.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(TableError::WeightSum {
                bucket: self.name.clone(),
                sum,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DimensionWeightResolver {
    buckets: Vec<ContextBucket>,
    default: ContextBucket,
}

impl DimensionWeightResolver {
    /// Buckets are matched in the order given. Every bucket's weights must sum to 1.0.
    pub fn new(
        buckets: Vec<ContextBucket>,
        default_weights: &[(&str, f64)],
    ) -> Result<Self, TableError> {
        let default = ContextBucket::new(DEFAULT_BUCKET, &[], default_weights);
        for bucket in buckets.iter().chain(std::iter::once(&default)) {
            bucket.validate()?;
        }
        Ok(Self { buckets, default })
    }

    /// A resolver with a single weight map applied to every record.
    pub fn uniform(weights: &[(&str, f64)]) -> Result<Self, TableError> {
        Self::new(Vec::new(), weights)
    }

    pub fn classify(&self, text: &str) -> &ContextBucket {
        let text = text.to_lowercase();
        self.buckets
            .iter()
            .find(|bucket| bucket.matches(&text))
            .unwrap_or(&self.default)
    }

    #[cfg(test)]
    pub fn resolve_weights(&self, text: &str) -> &WeightMap {
        self.classify(text).weights()
    }

    /// All buckets including the default one.
    #[cfg(test)]
    pub fn buckets(&self) -> impl Iterator<Item = &ContextBucket> {
        self.buckets.iter().chain(std::iter::once(&self.default))
    }
}

/// Weighted dimension score plus how much of the weight was actually covered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DimensionScore {
    pub score: f64,
    /// Sum of the weights of dimensions present in the record, 0–1.
    pub coverage: f64,
}

/// Applies `weights` to the declared scores, renormalizing over the dimensions
/// that are present. `None` if none of the weighted dimensions are present.
pub fn score_dimensions(
    dimension_scores: &BTreeMap<String, f64>,
    weights: &WeightMap,
) -> Option<DimensionScore> {
    let present: Vec<(f64, f64)> = weights
        .iter()
        .filter_map(|(dimension, weight)| {
            dimension_scores
                .get(dimension)
                .map(|&score| (clamp_score(score), *weight))
        })
        .collect();

    let coverage = present.iter().map(|(_, w)| w).sum::<f64>().min(1.0);
    weighted_mean(present).map(|score| DimensionScore { score, coverage })
}
