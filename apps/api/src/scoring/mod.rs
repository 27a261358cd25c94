//! Shared scoring primitives.
//!
//! The same weighted mean combines dimension scores inside a module and module
//! scores inside the aggregator.

pub mod resonance;
pub mod weights;

use thiserror::Error;

/// Construction-time violations of a hand-authored scoring table.
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("weights for bucket '{bucket}' sum to {sum}, expected 1.0")]
    WeightSum { bucket: String, sum: f64 },

    #[error("weight for '{dimension}' in bucket '{bucket}' is negative")]
    NegativeWeight { bucket: String, dimension: String },

    #[error("resonance {a}/{b} = {value} is outside [0, 1]")]
    ResonanceOutOfRange { a: String, b: String, value: f64 },

    #[error("resonance {a}/{b} defined twice with different values ({first} vs {second})")]
    AsymmetricPair {
        a: String,
        b: String,
        first: f64,
        second: f64,
    },

    #[error("self-resonance for '{state}' must be 1.0, got {value}")]
    SelfResonance { state: String, value: f64 },

    #[error("state '{0}' is not declared in the resonance table")]
    UnknownState(String),
}

/// Σ(value × weight) / Σ(weight). `None` when the total weight is zero.
/// Declared scores outside 0–100 are pinned to the nearest bound.
pub fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 100.0)
}

pub fn weighted_mean<I>(pairs: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (weighted, total) = pairs
        .into_iter()
        .fold((0.0_f64, 0.0_f64), |(weighted, total), (value, weight)| {
            (weighted + value * weight, total + weight)
        });

    if total > 0.0 {
        Some(weighted / total)
    } else {
        None
    }
}

/// Population standard deviation. Zero for fewer than two values.
pub fn population_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// `max(0, 1 − stddev/100)` over 0–100 scores: 1.0 when they all agree.
pub fn agreement(scores: &[f64]) -> f64 {
    (1.0 - population_std_dev(scores) / 100.0).max(0.0)
}
