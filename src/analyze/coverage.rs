//! Coverage tracker: which areas of the topic a session has touched so far.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::scoring::ScoreBreakdown;
use super::MatchHit;

/// Per-session cumulative state. Areas are only ever added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageState {
    pub topic_id: String,
    pub covered_area_ids: BTreeSet<String>,
    pub turn_scores: Vec<ScoreBreakdown>,
}

/// Result of folding one turn's hits into the covered set, not yet committed.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageUpdate {
    pub covered: BTreeSet<String>,
    pub newly_covered: Vec<String>,
    /// |covered| / |total areas| after the update.
    pub fraction: f64,
}

impl CoverageState {
    pub fn new(topic_id: impl Into<String>) -> Self {
        Self {
            topic_id: topic_id.into(),
            ..Default::default()
        }
    }

    /// Union the areas touched by `hits` into a copy of the covered set.
    pub fn preview(&self, hits: &[MatchHit], total_areas: usize) -> CoverageUpdate {
        let mut covered = self.covered_area_ids.clone();
        let mut newly_covered = Vec::new();
        for hit in hits {
            if covered.insert(hit.area_id.clone()) {
                newly_covered.push(hit.area_id.clone());
            }
        }
        CoverageUpdate {
            fraction: fraction(covered.len(), total_areas),
            covered,
            newly_covered,
        }
    }

    /// Commit a previewed update together with the turn's score.
    pub fn commit(&mut self, update: CoverageUpdate, breakdown: ScoreBreakdown) {
        debug_assert!(update.covered.is_superset(&self.covered_area_ids));
        self.covered_area_ids = update.covered;
        self.turn_scores.push(breakdown);
    }

    pub fn fraction(&self, total_areas: usize) -> f64 {
        fraction(self.covered_area_ids.len(), total_areas)
    }
}

fn fraction(covered: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (covered as f64 / total as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::MatchKind;
    use crate::catalog::{Keyword, Topic, TopicArea};

    fn hits_for(areas: &[&str]) -> Vec<MatchHit> {
        let topic = Topic::new(
            "t",
            "T",
            areas
                .iter()
                .map(|a| TopicArea::new(*a, *a, vec![Keyword::new(format!("kw {a}"), 1.0)]))
                .collect(),
        )
        .unwrap();
        topic
            .keywords()
            .map(|(area, kw)| MatchHit::new(kw, area, MatchKind::Lexical, 1.0))
            .collect()
    }

    #[test]
    fn preview_does_not_mutate_and_commit_is_monotone() {
        let mut state = CoverageState::new("t");
        let first = state.preview(&hits_for(&["a", "b"]), 4);
        assert!(state.covered_area_ids.is_empty());
        assert_eq!(first.newly_covered, vec!["a", "b"]);
        assert!((first.fraction - 0.5).abs() < 1e-9);
        state.commit(first, ScoreBreakdown::zero());

        let second = state.preview(&hits_for(&["b", "c"]), 4);
        assert_eq!(second.newly_covered, vec!["c"]);
        state.commit(second, ScoreBreakdown::zero());
        assert_eq!(
            state.covered_area_ids.iter().cloned().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );

        // a turn without hits keeps everything
        let third = state.preview(&[], 4);
        assert!((third.fraction - 0.75).abs() < 1e-9);
        assert!(third.newly_covered.is_empty());
        assert_eq!(state.turn_scores.len(), 2);
    }

    #[test]
    fn zero_areas_gives_zero_fraction() {
        assert_eq!(CoverageState::new("t").fraction(0), 0.0);
    }
}
