// src/config/scoring.rs
//! Scoring constants and session policies, loaded from TOML with env overrides.
//!
//! ```toml
//! semantic_threshold = 0.75
//! length_target_words = 40
//! oracle_timeout_ms = 1500
//! aggregation = "mean"        # "mean" | "max" | "last"
//!
//! [continue_policy]
//! target_score = 80.0
//! min_turns = 2
//! max_turns = 8
//! max_minutes = 10
//!
//! [oracle]
//! provider = "lexical"        # "lexical" | "openai" | "disabled"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use super::OracleConfig;

pub const DEFAULT_SCORING_CONFIG_PATH: &str = "config/scoring.toml";
pub const DEFAULT_SEMANTIC_THRESHOLD: f64 = 0.75;
pub const DEFAULT_LENGTH_TARGET_WORDS: usize = 40;
pub const DEFAULT_ORACLE_TIMEOUT_MS: u64 = 1500;

pub const ENV_SCORING_CONFIG_PATH: &str = "SCORING_CONFIG_PATH";
pub const ENV_SEMANTIC_THRESHOLD: &str = "SEMANTIC_THRESHOLD";
pub const ENV_LENGTH_TARGET_WORDS: &str = "LENGTH_TARGET_WORDS";
pub const ENV_ORACLE_TIMEOUT_MS: &str = "ORACLE_TIMEOUT_MS";
pub const ENV_AGGREGATION_POLICY: &str = "AGGREGATION_POLICY";

/// How per-turn totals fold into the session score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationPolicy {
    #[default]
    Mean,
    Max,
    Last,
}

impl AggregationPolicy {
    /// Aggregate a sequence of turn totals; 0 for no turns.
    pub fn aggregate(self, totals: &[f64]) -> f64 {
        if totals.is_empty() {
            return 0.0;
        }
        match self {
            Self::Mean => totals.iter().sum::<f64>() / totals.len() as f64,
            Self::Max => totals.iter().copied().fold(0.0, f64::max),
            Self::Last => totals[totals.len() - 1],
        }
    }
}

impl FromStr for AggregationPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "avg" | "average" => Ok(Self::Mean),
            "max" | "maximum" | "best" => Ok(Self::Max),
            "last" | "final" => Ok(Self::Last),
            other => anyhow::bail!("unknown aggregation policy `{other}`"),
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mean => "mean",
            Self::Max => "max",
            Self::Last => "last",
        };
        f.write_str(s)
    }
}

/// When a role-play session has gone on long enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuePolicy {
    pub target_score: f64,
    pub min_turns: usize,
    pub max_turns: usize,
    pub max_minutes: u64,
}

impl Default for ContinuePolicy {
    fn default() -> Self {
        Self {
            target_score: 80.0,
            min_turns: 2,
            max_turns: 8,
            max_minutes: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub semantic_threshold: f64,
    pub length_target_words: usize,
    pub oracle_timeout_ms: u64,
    pub aggregation: AggregationPolicy,
    pub continue_policy: ContinuePolicy,
    pub oracle: OracleConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            length_target_words: DEFAULT_LENGTH_TARGET_WORDS,
            oracle_timeout_ms: DEFAULT_ORACLE_TIMEOUT_MS,
            aggregation: AggregationPolicy::Mean,
            continue_policy: ContinuePolicy::default(),
            oracle: OracleConfig::default(),
        }
    }
}

impl ScoringConfig {
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: ScoringConfig = toml::from_str(s)?;
        Ok(cfg.sanitized())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading scoring config from {}", path.display()))?;
        Self::from_toml_str(&data)
            .with_context(|| format!("parsing scoring config {}", path.display()))
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $SCORING_CONFIG_PATH
    /// 2) config/scoring.toml
    /// 3) defaults
    pub fn load_default() -> Result<Self> {
        let base = if let Ok(p) = std::env::var(ENV_SCORING_CONFIG_PATH) {
            Self::load_from_file(PathBuf::from(p))?
        } else {
            let p = PathBuf::from(DEFAULT_SCORING_CONFIG_PATH);
            if p.exists() {
                Self::load_from_file(p)?
            } else {
                Self::default()
            }
        };
        let mut cfg = base.with_env_overrides();
        cfg.oracle = cfg.oracle.resolved();
        Ok(cfg)
    }

    /// Override single values from the environment; malformed values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(t) = parse_env::<f64>(ENV_SEMANTIC_THRESHOLD) {
            self.semantic_threshold = t;
        }
        if let Some(n) = parse_env::<usize>(ENV_LENGTH_TARGET_WORDS) {
            self.length_target_words = n;
        }
        if let Some(ms) = parse_env::<u64>(ENV_ORACLE_TIMEOUT_MS) {
            self.oracle_timeout_ms = ms;
        }
        if let Some(p) = parse_env::<AggregationPolicy>(ENV_AGGREGATION_POLICY) {
            self.aggregation = p;
        }
        self.sanitized()
    }

    /// Replace out-of-range values with defaults. The threshold must lie in (0, 1].
    pub fn sanitized(mut self) -> Self {
        if !(self.semantic_threshold.is_finite()
            && self.semantic_threshold > 0.0
            && self.semantic_threshold <= 1.0)
        {
            self.semantic_threshold = DEFAULT_SEMANTIC_THRESHOLD;
        }
        if self.length_target_words == 0 {
            self.length_target_words = DEFAULT_LENGTH_TARGET_WORDS;
        }
        if self.oracle_timeout_ms == 0 {
            self.oracle_timeout_ms = DEFAULT_ORACLE_TIMEOUT_MS;
        }
        let cp = &mut self.continue_policy;
        if !cp.target_score.is_finite() {
            cp.target_score = ContinuePolicy::default().target_score;
        }
        cp.target_score = cp.target_score.clamp(0.0, 100.0);
        if cp.max_turns < cp.min_turns {
            // keep a valid interval
            std::mem::swap(&mut cp.min_turns, &mut cp.max_turns);
        }
        self
    }
}

fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}
