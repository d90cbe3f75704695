//! Debug endpoints: inspect topics and preview how a text would score.
//! Mount with e.g. `app.merge(analyze::debug::router(engine))` in dev only.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use super::{MatchHit, TurnAnalysis};
use crate::api::ApiError;
use crate::catalog::Topic;
use crate::engine::ScoringEngine;

#[derive(Debug, Serialize)]
pub struct PreviewOut {
    pub topic_id: String,
    pub oracle: &'static str,
    pub base_score: f64,
    pub coverage_bonus: f64,
    pub length_bonus: f64,
    pub total: f64,
    pub hits: Vec<MatchHit>,
    pub newly_covered: Vec<String>,
    pub degraded: bool,
    pub oracle_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AreaOut {
    pub id: String,
    pub name: String,
    pub keywords: Vec<KeywordOut>,
}

#[derive(Debug, Serialize)]
pub struct KeywordOut {
    pub text: String,
    pub weight: f64,
    pub aliases: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TopicOut {
    pub id: String,
    pub name: String,
    pub total_keyword_weight: f64,
    pub areas: Vec<AreaOut>,
}

pub fn router(engine: Arc<ScoringEngine>) -> Router {
    Router::new()
        .route("/debug/match_preview", get(get_match_preview))
        .route("/debug/topics/{id}", get(get_topic))
        .with_state(engine)
}

fn preview_out(topic_id: &str, oracle: &'static str, a: TurnAnalysis) -> PreviewOut {
    PreviewOut {
        topic_id: topic_id.to_string(),
        oracle,
        base_score: a.breakdown.base_score,
        coverage_bonus: a.breakdown.coverage_bonus,
        length_bonus: a.breakdown.length_bonus,
        total: a.breakdown.total,
        hits: a.breakdown.hits,
        newly_covered: a.coverage.newly_covered,
        degraded: a.degraded,
        oracle_error: a.oracle_error.map(|e| e.to_string()),
    }
}

/// GET /debug/match_preview?topic=weather&text=...
async fn get_match_preview(
    State(engine): State<Arc<ScoringEngine>>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<PreviewOut>, ApiError> {
    let topic = q.get("topic").map(String::as_str).unwrap_or("weather");
    let text = q.get("text").cloned().unwrap_or_default();
    let analysis = engine.preview(topic, &text).await?;
    Ok(Json(preview_out(topic, engine.oracle_name(), analysis)))
}

fn topic_out(t: &Topic) -> TopicOut {
    TopicOut {
        id: t.id.clone(),
        name: t.name.clone(),
        total_keyword_weight: t.total_keyword_weight(),
        areas: t
            .areas
            .iter()
            .map(|a| AreaOut {
                id: a.id.clone(),
                name: a.name.clone(),
                keywords: a
                    .keywords
                    .iter()
                    .map(|k| KeywordOut {
                        text: k.text.clone(),
                        weight: k.weight,
                        aliases: k.aliases.iter().cloned().collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

async fn get_topic(
    State(engine): State<Arc<ScoringEngine>>,
    Path(id): Path<String>,
) -> Result<Json<TopicOut>, ApiError> {
    let topic = engine.topic(&id)?;
    Ok(Json(topic_out(&topic)))
}
