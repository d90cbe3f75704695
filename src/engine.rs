//! # Scoring Engine
//! Session registry over the shared topic catalog and similarity oracle.
//!
//! Each live session sits behind its own `tokio::sync::Mutex`, held across the whole turn
//! pipeline: turns of one session are serialized, different sessions run concurrently.
//! The registry lock itself is never held across an `.await`.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analyze::{analyze_turn, CoverageState, DynOracle, TurnAnalysis};
use crate::catalog::{Topic, TopicSource};
use crate::config::ScoringConfig;
use crate::error::ScoringError;
use crate::metrics as m;
use crate::report::{self, ProgressReport};
use crate::session::{Session, SessionSummary, TurnOutcome};
use crate::text::Utterance;

/// Ended sessions remembered for `SessionClosed` / repeated `end_session`.
pub const CLOSED_SESSIONS_CAP: usize = 1024;

/// Returned by `start_session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStart {
    pub session_id: String,
    pub topic_id: String,
    pub topic_name: String,
    pub introduction: String,
}

/// Summaries of ended sessions, oldest evicted first.
#[derive(Debug)]
struct ClosedSessions {
    order: VecDeque<String>,
    summaries: HashMap<String, SessionSummary>,
    cap: usize,
}

impl ClosedSessions {
    fn with_capacity(cap: usize) -> Self {
        Self {
            order: VecDeque::new(),
            summaries: HashMap::new(),
            cap: cap.max(1),
        }
    }

    fn insert(&mut self, summary: SessionSummary) {
        let id = summary.session_id.clone();
        if self.summaries.insert(id.clone(), summary).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > self.cap {
            if let Some(old) = self.order.pop_front() {
                self.summaries.remove(&old);
            }
        }
    }

    fn get(&self, id: &str) -> Option<&SessionSummary> {
        self.summaries.get(id)
    }
}

type SessionSlot = Arc<tokio::sync::Mutex<Session>>;

pub struct ScoringEngine {
    topics: Arc<dyn TopicSource>,
    oracle: DynOracle,
    config: ScoringConfig,
    sessions: RwLock<HashMap<String, SessionSlot>>,
    closed: Mutex<ClosedSessions>,
    seq: AtomicU64,
}

impl ScoringEngine {
    pub fn new(topics: Arc<dyn TopicSource>, oracle: DynOracle, config: ScoringConfig) -> Self {
        Self::with_closed_capacity(topics, oracle, config, CLOSED_SESSIONS_CAP)
    }

    pub fn with_closed_capacity(
        topics: Arc<dyn TopicSource>,
        oracle: DynOracle,
        config: ScoringConfig,
        closed_cap: usize,
    ) -> Self {
        m::describe();
        Self {
            topics,
            oracle,
            config,
            sessions: RwLock::new(HashMap::new()),
            closed: Mutex::new(ClosedSessions::with_capacity(closed_cap)),
            seq: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn oracle_name(&self) -> &'static str {
        self.oracle.name()
    }

    pub fn topic_ids(&self) -> Vec<String> {
        self.topics.topic_ids()
    }

    pub fn random_topic_id(&self) -> Option<String> {
        self.topics.random_topic_id()
    }

    pub fn topic(&self, topic_id: &str) -> Result<Arc<Topic>, ScoringError> {
        self.topics.load_topic(topic_id)
    }

    /// Number of sessions not yet ended.
    pub fn active_sessions(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next_session_id(&self, topic_id: &str) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{topic_id}_{}_{seq}", Utc::now().format("%Y%m%d_%H%M%S"))
    }

    fn live(&self, session_id: &str) -> Option<SessionSlot> {
        let map = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        map.get(session_id).cloned()
    }

    fn closed_summary(&self, session_id: &str) -> Option<SessionSummary> {
        let closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        closed.get(session_id).cloned()
    }

    /// Live session, or the right error for an ended / never issued id.
    fn slot(&self, session_id: &str) -> Result<SessionSlot, ScoringError> {
        if let Some(slot) = self.live(session_id) {
            return Ok(slot);
        }
        if self.closed_summary(session_id).is_some() {
            return Err(ScoringError::SessionClosed(session_id.to_string()));
        }
        Err(ScoringError::UnknownSession(session_id.to_string()))
    }

    pub fn start_session(&self, topic_id: &str) -> Result<SessionStart, ScoringError> {
        let topic = self.topics.load_topic(topic_id)?;
        let session_id = self.next_session_id(&topic.id);
        let start = SessionStart {
            session_id: session_id.clone(),
            topic_id: topic.id.clone(),
            topic_name: topic.name.clone(),
            introduction: topic.introduction.clone(),
        };

        let session = Session::new(session_id.clone(), topic, self.config.clone());
        let slot = Arc::new(tokio::sync::Mutex::new(session));
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session_id.clone(), slot);

        metrics::counter!(m::SESSIONS_STARTED).increment(1);
        info!(session_id = %session_id, topic = %start.topic_id, "session started");
        Ok(start)
    }

    /// Score one turn. `topic_id`, when given, must match the session's topic.
    pub async fn submit_turn(
        &self,
        session_id: &str,
        topic_id: Option<&str>,
        text: &str,
    ) -> Result<TurnOutcome, ScoringError> {
        let slot = self.slot(session_id)?;
        let mut session = slot.lock().await;

        if let Some(got) = topic_id {
            if got != session.topic().id {
                return Err(ScoringError::TopicMismatch {
                    session: session_id.to_string(),
                    expected: session.topic().id.clone(),
                    got: got.to_string(),
                });
            }
        }

        let outcome = session.submit_turn(text, self.oracle.as_ref()).await?;

        metrics::counter!(m::TURNS).increment(1);
        if outcome.degraded {
            metrics::counter!(m::DEGRADED_TURNS).increment(1);
        }
        metrics::histogram!(m::TURN_SCORE).record(outcome.breakdown.total);
        Ok(outcome)
    }

    pub async fn progress(&self, session_id: &str) -> Result<ProgressReport, ScoringError> {
        let slot = self.slot(session_id)?;
        let session = slot.lock().await;
        Ok(report::progress_report(&session))
    }

    /// Finalize and return the summary. Repeating the call returns the same summary.
    pub async fn end_session(&self, session_id: &str) -> Result<SessionSummary, ScoringError> {
        let Some(slot) = self.live(session_id) else {
            return self
                .closed_summary(session_id)
                .ok_or_else(|| ScoringError::UnknownSession(session_id.to_string()));
        };

        let summary = slot.lock().await.finalize();

        self.closed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(summary.clone());
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id);
        if removed.is_some() {
            metrics::counter!(m::SESSIONS_FINALIZED).increment(1);
        } else {
            warn!(session_id, "session already removed by a concurrent end");
        }
        Ok(summary)
    }

    /// Score `text` against a topic as a first turn, without touching any session.
    pub async fn preview(&self, topic_id: &str, text: &str) -> Result<TurnAnalysis, ScoringError> {
        let topic = self.topics.load_topic(topic_id)?;
        let coverage = CoverageState::new(topic.id.clone());
        Ok(analyze_turn(
            &topic,
            &Utterance::new(text),
            &coverage,
            self.oracle.as_ref(),
            &self.config,
        )
        .await)
    }
}
