use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::warn;

use crate::engine::{ScoringEngine, SessionStart};
use crate::error::ScoringError;
use crate::report::ProgressReport;
use crate::session::{SessionSummary, TurnOutcome};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ScoringEngine>,
}

pub fn router(engine: Arc<ScoringEngine>) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/topics", get(list_topics))
        .route("/sessions", post(start_session))
        .route("/sessions/{id}/turns", post(submit_turn))
        .route("/sessions/{id}/progress", get(progress))
        .route("/sessions/{id}/end", post(end_session))
        .layer(CorsLayer::very_permissive())
        .with_state(AppState { engine })
}

/// `ScoringError` as an HTTP response: `{"error": kind, "message": text}`.
#[derive(Debug)]
pub struct ApiError(pub ScoringError);

impl From<ScoringError> for ApiError {
    fn from(e: ScoringError) -> Self {
        Self(e)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            ScoringError::UnknownTopic(_) => (StatusCode::NOT_FOUND, "unknown_topic"),
            ScoringError::UnknownSession(_) => (StatusCode::NOT_FOUND, "unknown_session"),
            ScoringError::SessionClosed(_) => (StatusCode::CONFLICT, "session_closed"),
            ScoringError::TopicMismatch { .. } => (StatusCode::BAD_REQUEST, "topic_mismatch"),
            ScoringError::InvalidCatalog { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "invalid_catalog")
            }
        };
        if status.is_server_error() {
            warn!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error: kind,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct TopicOut {
    id: String,
    name: String,
    description: String,
    areas: Vec<String>,
    keywords: usize,
}

async fn list_topics(State(state): State<AppState>) -> Result<Json<Vec<TopicOut>>, ApiError> {
    let mut out = Vec::new();
    for id in state.engine.topic_ids() {
        let t = state.engine.topic(&id)?;
        out.push(TopicOut {
            areas: t.area_ids().map(str::to_string).collect(),
            keywords: t.keyword_count(),
            id: t.id.clone(),
            name: t.name.clone(),
            description: t.description.clone(),
        });
    }
    Ok(Json(out))
}

#[derive(Debug, Default, Deserialize)]
struct StartReq {
    /// Random topic when absent.
    #[serde(default)]
    topic_id: Option<String>,
}

async fn start_session(
    State(state): State<AppState>,
    body: Option<Json<StartReq>>,
) -> Result<(StatusCode, Json<SessionStart>), ApiError> {
    let req = body.map(|Json(b)| b).unwrap_or_default();
    let topic_id = match req.topic_id {
        Some(t) => t,
        None => state
            .engine
            .random_topic_id()
            .ok_or_else(|| ScoringError::UnknownTopic(String::new()))?,
    };
    let start = state.engine.start_session(&topic_id)?;
    Ok((StatusCode::CREATED, Json(start)))
}

#[derive(Debug, Deserialize)]
struct TurnReq {
    text: String,
    #[serde(default)]
    topic_id: Option<String>,
}

async fn submit_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TurnReq>,
) -> Result<Json<TurnOutcome>, ApiError> {
    let outcome = state
        .engine
        .submit_turn(&id, req.topic_id.as_deref(), &req.text)
        .await?;
    Ok(Json(outcome))
}

async fn progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProgressReport>, ApiError> {
    Ok(Json(state.engine.progress(&id).await?))
}

async fn end_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, ApiError> {
    Ok(Json(state.engine.end_session(&id).await?))
}
