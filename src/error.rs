//! Error taxonomy for catalog loading, session lifecycle and the similarity oracle.

use thiserror::Error;

/// Errors surfaced to callers of the scoring engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoringError {
    /// Topic id not present in the catalog.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// Malformed topic definition (fatal at load time).
    #[error("invalid catalog (topic `{topic}`): {reason}")]
    InvalidCatalog { topic: String, reason: String },

    /// Turn submitted after the session was finalized.
    #[error("session closed: {0}")]
    SessionClosed(String),

    /// Session id not present in the registry.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// Turn submitted for a topic other than the session's.
    #[error("session `{session}` is about `{expected}`, not `{got}`")]
    TopicMismatch {
        session: String,
        expected: String,
        got: String,
    },
}

impl ScoringError {
    pub(crate) fn invalid(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCatalog {
            topic: topic.into(),
            reason: reason.into(),
        }
    }
}

/// Similarity oracle failures. Always recovered inside a turn.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    #[error("oracle timed out after {0} ms")]
    Timeout(u64),

    #[error("oracle returned an invalid response: {0}")]
    InvalidResponse(String),
}
