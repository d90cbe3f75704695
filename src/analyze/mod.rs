// src/analyze/mod.rs
//! Turn analysis pipeline: lexical + semantic matching, resolution, coverage and scoring.
//! Order:
//! 1) Lexical matcher (stemmed whole words, aliases)
//! 2) Semantic matcher for the remaining keywords (similarity oracle, bounded by a timeout)
//! 3) Resolver: one hit per keyword
//! 4) Coverage preview against the session's covered areas
//! 5) Score breakdown
//!
//! Nothing here mutates session state; the caller commits the returned coverage update.

pub mod coverage;
pub mod debug;
pub mod lexical;
pub mod oracle;
pub mod resolver;
pub mod scoring;
pub mod semantic;

use serde::{Deserialize, Serialize};

use crate::catalog::{Keyword, Topic};
use crate::config::ScoringConfig;
use crate::error::OracleError;
use crate::text::Utterance;

// Re-export convenient types.
pub use crate::analyze::coverage::{CoverageState, CoverageUpdate};
pub use crate::analyze::oracle::{
    build_oracle, DisabledOracle, DynOracle, EmbeddingOracle, FixedOracle,
    LexicalSimilarityOracle, SimilarityOracle,
};
pub use crate::analyze::scoring::{compute_breakdown, ScoreBreakdown, ScoreInputs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Lexical,
    Semantic,
}

/// A detected occurrence of a keyword's concept in an utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchHit {
    /// Normalized keyword text; unique within a topic.
    pub keyword: String,
    pub area_id: String,
    pub kind: MatchKind,
    pub confidence: f64,
    pub contributed_weight: f64,
}

impl MatchHit {
    pub fn new(keyword: &Keyword, area_id: &str, kind: MatchKind, confidence: f64) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        let contributed_weight = match kind {
            MatchKind::Lexical => keyword.weight,
            MatchKind::Semantic => keyword.weight * confidence,
        };
        Self {
            keyword: keyword.text.clone(),
            area_id: area_id.to_string(),
            kind,
            confidence,
            contributed_weight,
        }
    }
}

/// Everything one turn produces before it is committed to the session.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnAnalysis {
    pub breakdown: ScoreBreakdown,
    pub coverage: CoverageUpdate,
    pub degraded: bool,
    pub oracle_error: Option<OracleError>,
}

/// Run the full pipeline for one utterance against the session's current coverage.
pub async fn analyze_turn(
    topic: &Topic,
    utterance: &Utterance,
    coverage: &CoverageState,
    oracle: &dyn SimilarityOracle,
    config: &ScoringConfig,
) -> TurnAnalysis {
    let text = utterance.normalized_text.as_str();

    let lexical_hits = lexical::find_lexical_hits(text, topic);
    let semantic_out = semantic::find_semantic_hits(
        text,
        topic,
        oracle,
        &lexical_hits,
        config.semantic_threshold,
        config.oracle_timeout(),
    )
    .await;

    let hits = resolver::resolve_hits(topic, lexical_hits, semantic_out.hits);
    let update = coverage.preview(&hits, topic.area_count());
    let breakdown = compute_breakdown(
        hits,
        ScoreInputs {
            total_keyword_weight: topic.total_keyword_weight(),
            coverage_fraction: update.fraction,
            word_count: utterance.word_count,
            length_target: config.length_target_words,
        },
    );

    TurnAnalysis {
        breakdown,
        coverage: update,
        degraded: semantic_out.degraded,
        oracle_error: semantic_out.error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TopicArea;

    fn weather() -> Topic {
        Topic::new(
            "weather",
            "Weather",
            vec![
                TopicArea::new(
                    "precipitation",
                    "Precipitation",
                    vec![Keyword::new("rain", 10.0), Keyword::new("precipitation", 20.0)],
                ),
                TopicArea::new("pressure", "Pressure", vec![Keyword::new("air pressure", 70.0)]),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn raining_scores_eight_base_points() {
        let topic = weather();
        let cfg = ScoringConfig::default();
        let out = analyze_turn(
            &topic,
            &Utterance::new("It is raining"),
            &CoverageState::new("weather"),
            &DisabledOracle,
            &cfg,
        )
        .await;
        assert!(out.degraded);
        assert!((out.breakdown.base_score - 8.0).abs() < 1e-9);
        assert_eq!(out.breakdown.coverage_bonus, 5.0);
        assert_eq!(out.coverage.newly_covered, vec!["precipitation"]);
    }

    #[tokio::test]
    async fn keyword_and_alias_repeated_yield_one_hit() {
        let topic = Topic::new(
            "weather",
            "Weather",
            vec![TopicArea::new(
                "precipitation",
                "Precipitation",
                vec![Keyword::new("rain", 10.0).with_aliases(["drizzle"])],
            )],
        )
        .unwrap();
        let out = analyze_turn(
            &topic,
            &Utterance::new("rain, drizzle, rain and drizzle"),
            &CoverageState::new("weather"),
            &FixedOracle::default(),
            &ScoringConfig::default(),
        )
        .await;
        assert_eq!(out.breakdown.hits.len(), 1);
        assert_eq!(out.breakdown.hits[0].kind, MatchKind::Lexical);
    }

    #[tokio::test]
    async fn semantic_hit_fills_in_paraphrase() {
        let topic = weather();
        let oracle = FixedOracle::new([("precipitation", 0.8)]);
        let out = analyze_turn(
            &topic,
            &Utterance::new("it is pouring down heavily"),
            &CoverageState::new("weather"),
            &oracle,
            &ScoringConfig::default(),
        )
        .await;
        assert!(!out.degraded);
        assert_eq!(out.breakdown.hits.len(), 1);
        assert_eq!(out.breakdown.hits[0].kind, MatchKind::Semantic);
        // 80 * (20 * 0.8) / 100
        assert!((out.breakdown.base_score - 12.8).abs() < 1e-9);
    }
}
