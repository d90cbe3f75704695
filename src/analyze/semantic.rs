//! Semantic matcher: paraphrase detection through the similarity oracle.
//!
//! Oracle failure or timeout never fails the turn: the pass yields no hits and the
//! outcome is flagged `degraded`.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, warn};

use super::oracle::SimilarityOracle;
use super::{MatchHit, MatchKind};
use crate::catalog::Topic;
use crate::error::OracleError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SemanticOutcome {
    pub hits: Vec<MatchHit>,
    pub degraded: bool,
    pub error: Option<OracleError>,
}

impl SemanticOutcome {
    fn degraded(error: OracleError) -> Self {
        Self {
            hits: Vec::new(),
            degraded: true,
            error: Some(error),
        }
    }
}

/// Ask the oracle about every keyword not already matched lexically; keep those at or
/// above `threshold`. The whole pass is bounded by `timeout`.
pub async fn find_semantic_hits(
    normalized: &str,
    topic: &Topic,
    oracle: &dyn SimilarityOracle,
    lexical: &[MatchHit],
    threshold: f64,
    timeout: Duration,
) -> SemanticOutcome {
    if normalized.is_empty() {
        return SemanticOutcome::default();
    }
    let already: HashSet<&str> = lexical.iter().map(|h| h.keyword.as_str()).collect();
    let candidates: Vec<_> = topic
        .keywords()
        .filter(|(_, kw)| !already.contains(kw.text.as_str()))
        .collect();
    if candidates.is_empty() {
        return SemanticOutcome::default();
    }

    let pass = async {
        let mut hits = Vec::new();
        for (area_id, kw) in &candidates {
            let sim = oracle.similarity(normalized, &kw.text).await?;
            if !sim.is_finite() {
                return Err(OracleError::InvalidResponse(format!(
                    "non-finite similarity for `{}`",
                    kw.text
                )));
            }
            let sim = sim.clamp(0.0, 1.0);
            // a zero similarity never covers an area, whatever the threshold
            if sim > 0.0 && sim >= threshold {
                hits.push(MatchHit::new(kw, area_id, MatchKind::Semantic, sim));
            }
        }
        Ok::<_, OracleError>(hits)
    };

    let result = match tokio::time::timeout(timeout, pass).await {
        Ok(inner) => inner,
        Err(_) => Err(OracleError::Timeout(timeout.as_millis() as u64)),
    };

    match result {
        Ok(hits) => {
            debug!(
                oracle = oracle.name(),
                candidates = candidates.len(),
                hits = hits.len(),
                "semantic pass done"
            );
            SemanticOutcome {
                hits,
                degraded: false,
                error: None,
            }
        }
        Err(e) => {
            warn!(oracle = oracle.name(), error = %e, "semantic pass degraded to lexical-only");
            SemanticOutcome::degraded(e)
        }
    }
}
