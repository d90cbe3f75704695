//! Similarity oracle: provider abstraction + local and remote implementations.
//!
//! The semantic matcher only sees `SimilarityOracle`; which backend answers is decided by
//! `build_oracle` from `[oracle]` config.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;
use tracing::warn;

use crate::config::OracleConfig;
use crate::error::OracleError;
use crate::text::{normalize_text, tokenize};

/// Meaning-similarity between an utterance and a keyword, in [0,1].
#[async_trait]
pub trait SimilarityOracle: Send + Sync {
    async fn similarity(&self, text: &str, keyword: &str) -> Result<f64, OracleError>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynOracle = Arc<dyn SimilarityOracle>;

/// Factory: build an oracle according to config.
pub fn build_oracle(config: &OracleConfig) -> DynOracle {
    match config.provider.as_str() {
        "openai" => Arc::new(EmbeddingOracle::new(config)),
        "disabled" | "none" => Arc::new(DisabledOracle),
        "lexical" => Arc::new(LexicalSimilarityOracle),
        other => {
            warn!(provider = other, "unknown oracle provider, using lexical");
            Arc::new(LexicalSimilarityOracle)
        }
    }
}

/// Always unavailable; every turn is scored lexical-only and flagged degraded.
pub struct DisabledOracle;

#[async_trait]
impl SimilarityOracle for DisabledOracle {
    async fn similarity(&self, _text: &str, _keyword: &str) -> Result<f64, OracleError> {
        Err(OracleError::Unavailable("oracle disabled".into()))
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Local surface similarity: the best word window of the utterance with the keyword's
/// word count, scored as the mean of per-word normalized Levenshtein. Catches misspellings
/// and inflections the stemmer misses ("temperatures", "humidty").
pub struct LexicalSimilarityOracle;

/// Words shorter than this only count when spelled exactly ("data" is not "lava").
pub const MIN_FUZZY_WORD_CHARS: usize = 5;

impl LexicalSimilarityOracle {
    pub fn score(text: &str, keyword: &str) -> f64 {
        let text = normalize_text(text);
        let keyword = normalize_text(keyword);
        let words = tokenize(&text);
        let wanted = tokenize(&keyword);
        if wanted.is_empty() || words.len() < wanted.len() {
            return 0.0;
        }
        words
            .windows(wanted.len())
            .map(|w| {
                let sum: f64 = w.iter().zip(&wanted).map(|(a, b)| word_similarity(a, b)).sum();
                sum / wanted.len() as f64
            })
            .fold(0.0, f64::max)
    }
}

fn word_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.chars().count().min(b.chars().count()) < MIN_FUZZY_WORD_CHARS {
        return 0.0;
    }
    normalized_levenshtein(a, b)
}

#[async_trait]
impl SimilarityOracle for LexicalSimilarityOracle {
    async fn similarity(&self, text: &str, keyword: &str) -> Result<f64, OracleError> {
        Ok(Self::score(text, keyword))
    }
    fn name(&self) -> &'static str {
        "lexical"
    }
}

/// Deterministic oracle answering from a fixed keyword → similarity table (0 otherwise).
#[derive(Debug, Clone, Default)]
pub struct FixedOracle {
    pub scores: HashMap<String, f64>,
}

impl FixedOracle {
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            scores: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[async_trait]
impl SimilarityOracle for FixedOracle {
    async fn similarity(&self, _text: &str, keyword: &str) -> Result<f64, OracleError> {
        Ok(self.scores.get(keyword).copied().unwrap_or(0.0))
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

// ------------------------------------------------------------
// Remote embeddings (OpenAI-compatible /embeddings)
// ------------------------------------------------------------

const EMBEDDING_CACHE_CAP: usize = 2048;

/// Cosine similarity of utterance and keyword embeddings, clamped to [0,1].
/// Embeddings are cached in memory so a turn costs one remote call per new text.
pub struct EmbeddingOracle {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    cache: Mutex<HashMap<String, Arc<Vec<f32>>>>,
}

impl EmbeddingOracle {
    pub fn new(config: &OracleConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("topic-coverage/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.clone(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, input: &str) -> Option<Arc<Vec<f32>>> {
        self.cache.lock().ok()?.get(input).cloned()
    }

    fn remember(&self, input: &str, embedding: Arc<Vec<f32>>) {
        if let Ok(mut cache) = self.cache.lock() {
            if cache.len() >= EMBEDDING_CACHE_CAP {
                cache.clear();
            }
            cache.insert(input.to_string(), embedding);
        }
    }

    async fn embed(&self, input: &str) -> Result<Arc<Vec<f32>>, OracleError> {
        if let Some(hit) = self.cached(input) {
            return Ok(hit);
        }
        if self.api_key.is_empty() {
            return Err(OracleError::Unavailable("OPENAI_API_KEY is not set".into()));
        }

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            input: &'a str,
        }
        #[derive(Deserialize)]
        struct Resp {
            data: Vec<Item>,
        }
        #[derive(Deserialize)]
        struct Item {
            embedding: Vec<f32>,
        }

        let resp = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&Req {
                model: &self.model,
                input,
            })
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OracleError::Unavailable(format!("HTTP {status}")));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|it| it.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| OracleError::InvalidResponse("empty embedding".into()))?;

        let embedding = Arc::new(embedding);
        self.remember(input, embedding.clone());
        Ok(embedding)
    }
}

#[async_trait]
impl SimilarityOracle for EmbeddingOracle {
    async fn similarity(&self, text: &str, keyword: &str) -> Result<f64, OracleError> {
        let a = self.embed(text).await?;
        let b = self.embed(keyword).await?;
        if a.len() != b.len() {
            return Err(OracleError::InvalidResponse(format!(
                "dimension mismatch: {} vs {}",
                a.len(),
                b.len()
            )));
        }
        Ok(cosine(&a, &b).clamp(0.0, 1.0))
    }
    fn name(&self) -> &'static str {
        "openai"
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na <= 0.0 || nb <= 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}
