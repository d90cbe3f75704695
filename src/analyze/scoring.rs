//! Score calculator: one turn's hits, coverage and length into a bounded 0–100 score.
//!
//! - `base_score     = clamp(80 * Σ contributed_weight / total_keyword_weight, 0, 80)`
//! - `coverage_bonus = round(10 * coverage_fraction)`
//! - `length_bonus   = 5 * min(1, word_count / length_target)`
//! - `total          = clamp(base + coverage + length, 0, 100)`
//!
//! An empty utterance scores zero on every component.

use serde::{Deserialize, Serialize};

use super::MatchHit;

pub const BASE_MAX: f64 = 80.0;
pub const COVERAGE_MAX: f64 = 10.0;
pub const LENGTH_MAX: f64 = 5.0;
pub const TOTAL_MAX: f64 = 100.0;

/// Itemized, immutable result for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base_score: f64,
    pub coverage_bonus: f64,
    pub length_bonus: f64,
    pub total: f64,
    pub hits: Vec<MatchHit>,
}

impl ScoreBreakdown {
    pub fn zero() -> Self {
        Self {
            base_score: 0.0,
            coverage_bonus: 0.0,
            length_bonus: 0.0,
            total: 0.0,
            hits: Vec::new(),
        }
    }
}

/// Inputs to the calculator. Keep it small and clear.
#[derive(Clone, Copy, Debug)]
pub struct ScoreInputs {
    pub total_keyword_weight: f64,
    pub coverage_fraction: f64,
    pub word_count: usize,
    pub length_target: usize,
}

pub fn base_score(hits: &[MatchHit], total_keyword_weight: f64) -> f64 {
    if total_keyword_weight <= 0.0 {
        return 0.0;
    }
    let matched: f64 = hits.iter().map(|h| h.contributed_weight).sum();
    (BASE_MAX * matched / total_keyword_weight).clamp(0.0, BASE_MAX)
}

pub fn coverage_bonus(coverage_fraction: f64) -> f64 {
    (COVERAGE_MAX * coverage_fraction.clamp(0.0, 1.0)).round()
}

pub fn length_bonus(word_count: usize, length_target: usize) -> f64 {
    if length_target == 0 {
        return if word_count > 0 { LENGTH_MAX } else { 0.0 };
    }
    let ratio = (word_count as f64 / length_target as f64).min(1.0);
    (LENGTH_MAX * ratio).clamp(0.0, LENGTH_MAX)
}

/// Pure function of the turn's resolved hits and inputs.
pub fn compute_breakdown(hits: Vec<MatchHit>, inputs: ScoreInputs) -> ScoreBreakdown {
    if inputs.word_count == 0 {
        return ScoreBreakdown::zero();
    }
    let base_score = base_score(&hits, inputs.total_keyword_weight);
    let coverage_bonus = coverage_bonus(inputs.coverage_fraction);
    let length_bonus = length_bonus(inputs.word_count, inputs.length_target);
    let total = (base_score + coverage_bonus + length_bonus).clamp(0.0, TOTAL_MAX);
    ScoreBreakdown {
        base_score,
        coverage_bonus,
        length_bonus,
        total,
        hits,
    }
}
