// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod report;
pub mod session;
pub mod text;

// Turn pipeline (lexical, semantic, resolver, coverage, scoring, debug)
pub mod analyze;

use std::sync::Arc;

use axum::Router;
use tracing::info;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{MatchHit, MatchKind, ScoreBreakdown, SimilarityOracle};
pub use crate::catalog::{Keyword, Topic, TopicArea, TopicCatalog, TopicSource};
pub use crate::config::{AggregationPolicy, ScoringConfig};
pub use crate::engine::{ScoringEngine, SessionStart};
pub use crate::error::{OracleError, ScoringError};
pub use crate::session::{Session, SessionSummary, TurnOutcome};

/// Env flag mounting `/debug/*` routes.
pub const ENV_DEBUG_ROUTES: &str = "COVERAGE_DEBUG_ROUTES";

/// Build the engine from env/config files:
/// scoring config (`SCORING_CONFIG_PATH` or defaults), topic catalog (installed process-wide)
/// and the configured similarity oracle.
pub fn engine_from_env() -> anyhow::Result<Arc<ScoringEngine>> {
    let config = ScoringConfig::load_default()?;
    let catalog = catalog::install(TopicCatalog::load_default()?);
    let oracle = analyze::build_oracle(&config.oracle);
    info!(
        topics = catalog.len(),
        oracle = oracle.name(),
        aggregation = %config.aggregation,
        threshold = config.semantic_threshold,
        "scoring engine ready"
    );
    Ok(Arc::new(ScoringEngine::new(catalog, oracle, config)))
}

/// Public API router, plus `/debug/*` when `debug_routes` is set.
pub fn app(engine: Arc<ScoringEngine>, debug_routes: bool) -> Router {
    let router = api::router(engine.clone());
    if debug_routes {
        router.merge(analyze::debug::router(engine))
    } else {
        router
    }
}

/// `COVERAGE_DEBUG_ROUTES=1` (or `true`)
pub fn debug_routes_enabled() -> bool {
    std::env::var(ENV_DEBUG_ROUTES)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
