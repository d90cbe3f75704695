use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const SESSIONS_STARTED: &str = "coverage_sessions_started_total";
pub const SESSIONS_FINALIZED: &str = "coverage_sessions_finalized_total";
pub const TURNS: &str = "coverage_turns_total";
pub const DEGRADED_TURNS: &str = "coverage_degraded_turns_total";
pub const TURN_SCORE: &str = "coverage_turn_score";
pub const SEMANTIC_THRESHOLD: &str = "coverage_semantic_threshold";

static DESCRIBED: OnceCell<()> = OnceCell::new();

/// Register metric descriptions once per process. Without an installed recorder this is a no-op.
pub fn describe() {
    DESCRIBED.get_or_init(describe_all);
}

fn describe_all() {
    describe_counter!(SESSIONS_STARTED, "Scoring sessions started");
    describe_counter!(SESSIONS_FINALIZED, "Scoring sessions ended");
    describe_counter!(TURNS, "Turns scored");
    describe_counter!(DEGRADED_TURNS, "Turns scored lexical-only after an oracle failure");
    describe_histogram!(TURN_SCORE, "Per-turn total score (0-100)");
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and expose the semantic threshold as a static gauge.
    pub fn init(semantic_threshold: f64) -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        // descriptions emitted before the recorder existed were dropped
        describe_all();
        gauge!(SEMANTIC_THRESHOLD).set(semantic_threshold);
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
