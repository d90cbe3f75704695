// src/session.rs
//! Session aggregator: owns one session's coverage state and folds turn scores into
//! running and final session scores.
//!
//! Lifecycle: `Created → InProgress → Finalized`. A turn's analysis runs to completion
//! before anything is committed, so dropping `submit_turn` mid-flight leaves the session
//! exactly as it was.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analyze::{analyze_turn, CoverageState, ScoreBreakdown, SimilarityOracle};
use crate::catalog::Topic;
use crate::config::{AggregationPolicy, ScoringConfig};
use crate::diagnostics::{anon_hash, TurnTrace};
use crate::error::ScoringError;
use crate::report;
use crate::text::Utterance;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Created,
    InProgress,
    Finalized,
}

/// What a caller gets back for one scored turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub session_id: String,
    /// 0-based index of this turn within the session.
    pub turn_index: usize,
    pub breakdown: ScoreBreakdown,
    pub degraded: bool,
    pub newly_covered: Vec<String>,
    pub running_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub topic_id: String,
    pub aggregation: AggregationPolicy,
    pub mean_score: f64,
    /// Session score under the configured aggregation policy.
    pub final_score: f64,
    pub max_score: f64,
    pub last_score: f64,
    pub coverage_percent: f64,
    pub areas_covered: BTreeSet<String>,
    pub areas_missed: BTreeSet<String>,
    pub turns: usize,
    pub degraded_turns: usize,
    pub total_words: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub suggestions: Vec<String>,
}

#[derive(Debug)]
pub struct Session {
    id: String,
    topic: Arc<Topic>,
    config: ScoringConfig,
    phase: SessionPhase,
    coverage: CoverageState,
    /// keyword → best confidence seen in any turn
    best_matches: BTreeMap<String, f64>,
    degraded_turns: usize,
    total_words: usize,
    started_at: DateTime<Utc>,
    summary: Option<SessionSummary>,
}

impl Session {
    pub fn new(id: impl Into<String>, topic: Arc<Topic>, config: ScoringConfig) -> Self {
        Self {
            id: id.into(),
            coverage: CoverageState::new(topic.id.clone()),
            topic,
            config,
            phase: SessionPhase::Created,
            best_matches: BTreeMap::new(),
            degraded_turns: 0,
            total_words: 0,
            started_at: Utc::now(),
            summary: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn coverage(&self) -> &CoverageState {
        &self.coverage
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn turn_count(&self) -> usize {
        self.coverage.turn_scores.len()
    }

    pub fn coverage_fraction(&self) -> f64 {
        self.coverage.fraction(self.topic.area_count())
    }

    /// Keyword → best confidence over all committed turns.
    pub fn matched_keywords(&self) -> &BTreeMap<String, f64> {
        &self.best_matches
    }

    /// Keywords never matched so far, in catalog order.
    pub fn missing_keywords(&self) -> Vec<&str> {
        self.topic
            .keywords()
            .map(|(_, kw)| kw.text.as_str())
            .filter(|k| !self.best_matches.contains_key(*k))
            .collect()
    }

    fn totals(&self) -> Vec<f64> {
        self.coverage.turn_scores.iter().map(|b| b.total).collect()
    }

    /// Session score so far under the configured aggregation policy.
    pub fn running_score(&self) -> f64 {
        self.config.aggregation.aggregate(&self.totals())
    }

    /// Score one utterance and commit it.
    pub async fn submit_turn(
        &mut self,
        text: &str,
        oracle: &dyn SimilarityOracle,
    ) -> Result<TurnOutcome, ScoringError> {
        if self.phase == SessionPhase::Finalized {
            return Err(ScoringError::SessionClosed(self.id.clone()));
        }

        let utterance = Utterance::new(text);
        let analysis =
            analyze_turn(&self.topic, &utterance, &self.coverage, oracle, &self.config).await;

        // --- commit (no await below this line) ---
        let newly_covered = analysis.coverage.newly_covered.clone();
        for hit in &analysis.breakdown.hits {
            let best = self.best_matches.entry(hit.keyword.clone()).or_insert(0.0);
            *best = best.max(hit.confidence);
        }
        if analysis.degraded {
            self.degraded_turns += 1;
        }
        self.total_words += utterance.word_count;
        let breakdown = analysis.breakdown;
        self.coverage.commit(analysis.coverage, breakdown.clone());
        self.phase = SessionPhase::InProgress;

        let turn_index = self.turn_count() - 1;
        let matched: Vec<String> = breakdown.hits.iter().map(|h| h.keyword.clone()).collect();
        let utterance_id = anon_hash(&utterance.raw_text);
        info!(
            session_id = %self.id,
            utterance = %utterance_id,
            turn = turn_index,
            total = breakdown.total,
            hits = matched.len(),
            degraded = analysis.degraded,
            "turn scored"
        );
        TurnTrace {
            session_id: &self.id,
            utterance_id,
            matched: &matched,
            newly_covered: &newly_covered,
            total: breakdown.total,
            degraded: analysis.degraded,
        }
        .emit();

        Ok(TurnOutcome {
            session_id: self.id.clone(),
            turn_index,
            running_score: self.running_score(),
            degraded: analysis.degraded,
            newly_covered,
            breakdown,
        })
    }

    /// Summary of the session as it stands; `ended_at` stays empty until finalized.
    pub fn summary(&self) -> SessionSummary {
        let totals = self.totals();
        let covered = self.coverage.covered_area_ids.clone();
        let missed = self
            .topic
            .area_ids()
            .filter(|a| !covered.contains(*a))
            .map(str::to_string)
            .collect();

        SessionSummary {
            session_id: self.id.clone(),
            topic_id: self.topic.id.clone(),
            aggregation: self.config.aggregation,
            mean_score: AggregationPolicy::Mean.aggregate(&totals),
            final_score: self.config.aggregation.aggregate(&totals),
            max_score: AggregationPolicy::Max.aggregate(&totals),
            last_score: AggregationPolicy::Last.aggregate(&totals),
            coverage_percent: 100.0 * self.coverage_fraction(),
            areas_covered: covered,
            areas_missed: missed,
            turns: totals.len(),
            degraded_turns: self.degraded_turns,
            total_words: self.total_words,
            started_at: self.started_at,
            ended_at: None,
            suggestions: report::improvement_suggestions(&self.missing_keywords()),
        }
    }

    /// Close the session. Idempotent: later calls return the same summary.
    pub fn finalize(&mut self) -> SessionSummary {
        if let Some(done) = &self.summary {
            return done.clone();
        }
        let mut summary = self.summary();
        summary.ended_at = Some(Utc::now());
        self.phase = SessionPhase::Finalized;
        self.summary = Some(summary.clone());
        info!(
            session_id = %self.id,
            final_score = summary.final_score,
            coverage_percent = summary.coverage_percent,
            turns = summary.turns,
            "session finalized"
        );
        summary
    }
}
