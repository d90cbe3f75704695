// src/catalog.rs
//! Topic catalog: validated topic definitions, file loading and the process-wide instance.
//!
//! File shape (TOML; JSON with the same structure is accepted too):
//! ```toml
//! [[topics]]
//! id = "weather"
//! name = "Weather"
//! introduction = "Tell me about the weather."
//!
//! [[topics.areas]]
//! id = "precipitation"
//! name = "Precipitation"
//! keywords = [{ text = "rain", weight = 10.0, aliases = ["drizzle"] }]
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use anyhow::{Context, Result};
use rand::seq::IteratorRandom;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ScoringError;
use crate::text::{normalize_text, stem_phrase};

pub const DEFAULT_CATALOG_PATH: &str = "config/topics.toml";
pub const ENV_CATALOG_PATH: &str = "TOPIC_CATALOG_PATH";

const BUILTIN_CATALOG: &str = include_str!("../config/topics.toml");

/// A weighted concept inside an area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    pub weight: f64,
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    /// Stemmed token sequences of `text` and every alias, filled in by validation.
    #[serde(skip)]
    pub(crate) forms: Vec<Vec<String>>,
}

impl Keyword {
    pub fn new(text: impl Into<String>, weight: f64) -> Self {
        Self {
            text: text.into(),
            weight,
            aliases: BTreeSet::new(),
            forms: Vec::new(),
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }
}

/// One sub-concept of a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicArea {
    pub id: String,
    pub name: String,
    pub keywords: Vec<Keyword>,
}

impl TopicArea {
    pub fn new(id: impl Into<String>, name: impl Into<String>, keywords: Vec<Keyword>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            keywords,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Opening line the dialogue partner uses to start a session.
    #[serde(default)]
    pub introduction: String,
    pub areas: Vec<TopicArea>,
    #[serde(skip)]
    total_weight: f64,
}

impl Topic {
    /// Build and validate a topic.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        areas: Vec<TopicArea>,
    ) -> Result<Self, ScoringError> {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            introduction: String::new(),
            areas,
            total_weight: 0.0,
        }
        .validated()
    }

    pub fn with_introduction(mut self, introduction: impl Into<String>) -> Self {
        self.introduction = introduction.into();
        self
    }

    /// Sum of all keyword weights across the topic (precomputed at validation).
    pub fn total_keyword_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn area_count(&self) -> usize {
        self.areas.len()
    }

    pub fn area_ids(&self) -> impl Iterator<Item = &str> {
        self.areas.iter().map(|a| a.id.as_str())
    }

    /// All keywords with their area id, in catalog order.
    pub fn keywords(&self) -> impl Iterator<Item = (&str, &Keyword)> {
        self.areas
            .iter()
            .flat_map(|a| a.keywords.iter().map(move |k| (a.id.as_str(), k)))
    }

    pub fn keyword_count(&self) -> usize {
        self.areas.iter().map(|a| a.keywords.len()).sum()
    }

    /// Check the invariants and normalize keyword text/aliases.
    fn validated(mut self) -> Result<Self, ScoringError> {
        self.id = self.id.trim().to_string();
        if self.id.is_empty() {
            return Err(ScoringError::invalid("<unnamed>", "topic id is empty"));
        }
        let topic_id = self.id.clone();
        if self.areas.is_empty() {
            return Err(ScoringError::invalid(&topic_id, "topic has no areas"));
        }

        let mut area_ids = HashSet::new();
        let mut keyword_texts = HashSet::new();
        let mut total = 0.0;

        for area in &mut self.areas {
            area.id = area.id.trim().to_string();
            if area.id.is_empty() {
                return Err(ScoringError::invalid(&topic_id, "area id is empty"));
            }
            if !area_ids.insert(area.id.clone()) {
                return Err(ScoringError::invalid(
                    &topic_id,
                    format!("duplicate area id `{}`", area.id),
                ));
            }
            if area.keywords.is_empty() {
                return Err(ScoringError::invalid(
                    &topic_id,
                    format!("area `{}` has no keywords", area.id),
                ));
            }

            for kw in &mut area.keywords {
                kw.text = normalize_text(&kw.text);
                if kw.text.is_empty() {
                    return Err(ScoringError::invalid(
                        &topic_id,
                        format!("area `{}` has an empty keyword", area.id),
                    ));
                }
                if !(kw.weight.is_finite() && kw.weight > 0.0) {
                    return Err(ScoringError::invalid(
                        &topic_id,
                        format!("keyword `{}` has non-positive weight {}", kw.text, kw.weight),
                    ));
                }
                if !keyword_texts.insert(kw.text.clone()) {
                    return Err(ScoringError::invalid(
                        &topic_id,
                        format!("duplicate keyword `{}`", kw.text),
                    ));
                }

                kw.aliases = kw
                    .aliases
                    .iter()
                    .map(|a| normalize_text(a))
                    .filter(|a| !a.is_empty() && *a != kw.text)
                    .collect();

                let mut forms = vec![stem_phrase(&kw.text)];
                for alias in &kw.aliases {
                    let form = stem_phrase(alias);
                    if !forms.contains(&form) {
                        forms.push(form);
                    }
                }
                kw.forms = forms;
                total += kw.weight;
            }
        }

        self.total_weight = total;
        Ok(self)
    }
}

/// Read-only access to topic definitions.
pub trait TopicSource: Send + Sync {
    fn load_topic(&self, topic_id: &str) -> Result<Arc<Topic>, ScoringError>;
    fn topic_ids(&self) -> Vec<String>;

    /// Pick a topic id uniformly at random; `None` when the source is empty.
    fn random_topic_id(&self) -> Option<String> {
        self.topic_ids().into_iter().choose(&mut rand::rng())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    topics: Vec<Topic>,
}

/// Validated, immutable set of topics keyed by id.
#[derive(Debug, Clone, Default)]
pub struct TopicCatalog {
    topics: BTreeMap<String, Arc<Topic>>,
}

impl TopicCatalog {
    /// Build from already-constructed topics (validated again here).
    pub fn from_topics(topics: Vec<Topic>) -> Result<Self, ScoringError> {
        let mut map = BTreeMap::new();
        for topic in topics {
            let topic = topic.validated()?;
            if map.contains_key(&topic.id) {
                return Err(ScoringError::invalid(&topic.id, "duplicate topic id"));
            }
            map.insert(topic.id.clone(), Arc::new(topic));
        }
        Ok(Self { topics: map })
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ScoringError> {
        let file: CatalogFile =
            toml::from_str(s).map_err(|e| ScoringError::invalid("<catalog>", e.to_string()))?;
        Self::from_topics(file.topics)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ScoringError> {
        let file: CatalogFile = serde_json::from_str(s)
            .map_err(|e| ScoringError::invalid("<catalog>", e.to_string()))?;
        Self::from_topics(file.topics)
    }

    /// Load from an explicit path. `.json` is parsed as JSON, anything else as TOML.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading topic catalog from {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let catalog = if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
        .with_context(|| format!("validating topic catalog {}", path.display()))?;
        Ok(catalog)
    }

    /// Catalog compiled into the binary.
    pub fn builtin() -> Result<Self, ScoringError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Load using env var + fallbacks:
    /// 1) $TOPIC_CATALOG_PATH
    /// 2) config/topics.toml
    /// 3) built-in catalog
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CATALOG_PATH) {
            let pb = PathBuf::from(p);
            anyhow::ensure!(
                pb.exists(),
                "{ENV_CATALOG_PATH} points to non-existent path {}",
                pb.display()
            );
            return Self::from_path(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_CATALOG_PATH);
        if default_path.exists() {
            return Self::from_path(&default_path);
        }
        Ok(Self::builtin()?)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn topics(&self) -> impl Iterator<Item = &Arc<Topic>> {
        self.topics.values()
    }
}

impl TopicSource for TopicCatalog {
    fn load_topic(&self, topic_id: &str) -> Result<Arc<Topic>, ScoringError> {
        self.topics
            .get(topic_id)
            .cloned()
            .ok_or_else(|| ScoringError::UnknownTopic(topic_id.to_string()))
    }

    fn topic_ids(&self) -> Vec<String> {
        self.topics.keys().cloned().collect()
    }
}

static INSTALLED: OnceLock<Arc<TopicCatalog>> = OnceLock::new();

/// One-time initialization of the process-wide catalog.
/// Later calls return the instance installed first and drop their argument.
pub fn install(catalog: TopicCatalog) -> Arc<TopicCatalog> {
    let mut fresh = false;
    let installed = INSTALLED.get_or_init(|| {
        fresh = true;
        Arc::new(catalog)
    });
    if fresh {
        info!(topics = installed.len(), "topic catalog installed");
    }
    installed.clone()
}

/// The process-wide catalog, if `install` has run.
pub fn installed() -> Option<Arc<TopicCatalog>> {
    INSTALLED.get().cloned()
}
