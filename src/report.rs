// src/report.rs
//! Progress report and continuation policy for a live session.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ContinuePolicy;
use crate::session::Session;

/// Covered keywords listed in a report.
pub const TOP_COVERED: usize = 5;
/// Missing keywords named in a suggestion.
pub const SUGGESTED_KEYWORDS: usize = 3;
/// Coverage above which the session is reported as progressing well.
pub const GOOD_COVERAGE: f64 = 0.6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoveredKeyword {
    pub keyword: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinueDecision {
    #[serde(rename = "continue")]
    pub proceed: bool,
    pub reason: String,
}

impl ContinueDecision {
    fn proceed(reason: impl Into<String>) -> Self {
        Self {
            proceed: true,
            reason: reason.into(),
        }
    }
    fn stop(reason: impl Into<String>) -> Self {
        Self {
            proceed: false,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub session_id: String,
    pub topic_id: String,
    pub running_score: f64,
    pub turns: usize,
    pub coverage_percent: f64,
    pub covered: Vec<CoveredKeyword>,
    pub suggestions: Vec<String>,
    pub decision: ContinueDecision,
}

/// "Try discussing: a, b, c" from the first few missing keywords; empty when nothing is missing.
pub fn improvement_suggestions(missing: &[&str]) -> Vec<String> {
    if missing.is_empty() {
        return Vec::new();
    }
    let named: Vec<&str> = missing.iter().take(SUGGESTED_KEYWORDS).copied().collect();
    vec![format!("Try discussing: {}", named.join(", "))]
}

pub fn should_continue(session: &Session) -> ContinueDecision {
    should_continue_at(session, Utc::now())
}

/// Continuation rules, first match wins.
pub fn should_continue_at(session: &Session, now: DateTime<Utc>) -> ContinueDecision {
    let policy: &ContinuePolicy = &session.config().continue_policy;
    let turns = session.turn_count();
    let score = session.running_score();

    if turns < policy.min_turns {
        return ContinueDecision::proceed("conversation just started");
    }
    if score >= policy.target_score {
        return ContinueDecision::stop(format!("target score reached ({score:.1})"));
    }
    if turns >= policy.max_turns {
        return ContinueDecision::stop(format!("turn limit reached ({turns})"));
    }
    let elapsed = now.signed_duration_since(session.started_at());
    if elapsed.num_seconds() > (policy.max_minutes as i64) * 60 {
        return ContinueDecision::stop(format!("time limit reached ({} min)", policy.max_minutes));
    }
    let coverage = session.coverage_fraction();
    if coverage >= GOOD_COVERAGE {
        return ContinueDecision::proceed(format!(
            "good progress ({:.0}% covered)",
            coverage * 100.0
        ));
    }
    ContinueDecision::proceed("keep exploring the topic")
}

pub fn progress_report(session: &Session) -> ProgressReport {
    progress_report_at(session, Utc::now())
}

pub fn progress_report_at(session: &Session, now: DateTime<Utc>) -> ProgressReport {
    let matched = session.matched_keywords();
    let covered = session
        .topic()
        .keywords()
        .filter_map(|(_, kw)| {
            matched.get(&kw.text).map(|c| CoveredKeyword {
                keyword: kw.text.clone(),
                confidence: *c,
            })
        })
        .take(TOP_COVERED)
        .collect();

    ProgressReport {
        session_id: session.id().to_string(),
        topic_id: session.topic().id.clone(),
        running_score: session.running_score(),
        turns: session.turn_count(),
        coverage_percent: 100.0 * session.coverage_fraction(),
        covered,
        suggestions: improvement_suggestions(&session.missing_keywords()),
        decision: should_continue_at(session, now),
    }
}

impl fmt::Display for ProgressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session {} ({})", self.session_id, self.topic_id)?;
        writeln!(f, "Score: {:.1}/100 after {} turns", self.running_score, self.turns)?;
        writeln!(f, "Coverage: {:.0}%", self.coverage_percent)?;
        if !self.covered.is_empty() {
            writeln!(f, "Covered:")?;
            for c in &self.covered {
                writeln!(f, "  - {} ({:.2})", c.keyword, c.confidence)?;
            }
        }
        for s in &self.suggestions {
            writeln!(f, "{s}")?;
        }
        let verb = if self.decision.proceed { "continue" } else { "stop" };
        write!(f, "Next: {verb} ({})", self.decision.reason)
    }
}
