// tests/catalog_config.rs
//
// Catalog + scoring config loading from files and env.
// Env-mutating tests are #[serial] because the process env is shared.

use std::env;
use std::io::Write;

use serial_test::serial;
use tempfile::NamedTempFile;

use topic_coverage::catalog::{TopicSource, ENV_CATALOG_PATH};
use topic_coverage::config::scoring::ENV_SCORING_CONFIG_PATH;
use topic_coverage::{AggregationPolicy, ScoringConfig, ScoringError, TopicCatalog};

/// Snapshot & restore env vars for one test.
struct EnvSnapshot {
    saved: Vec<(String, Option<String>)>,
}
impl EnvSnapshot {
    fn set(pairs: &[(&str, Option<&str>)]) -> Self {
        let mut saved = Vec::with_capacity(pairs.len());
        for (k, v) in pairs {
            saved.push((k.to_string(), env::var(k).ok()));
            match v {
                Some(val) => env::set_var(k, val),
                None => env::remove_var(k),
            }
        }
        Self { saved }
    }
}
impl Drop for EnvSnapshot {
    fn drop(&mut self) {
        for (k, v) in self.saved.drain(..) {
            match v {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}

fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
    let mut f = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("tempfile");
    f.write_all(content.as_bytes()).expect("write");
    f
}

const SMALL_TOML: &str = r#"
[[topics]]
id = "coffee"
name = "Coffee"

[[topics.areas]]
id = "beans"
name = "Beans"
keywords = [{ text = "Arabica", weight = 2.0, aliases = ["Robusta"] }]
"#;

#[test]
fn catalog_from_toml_file_normalizes_keywords() {
    let f = temp_file(".toml", SMALL_TOML);
    let cat = TopicCatalog::from_path(f.path()).unwrap();
    let topic = cat.load_topic("coffee").unwrap();
    let (_, kw) = topic.keywords().next().unwrap();
    assert_eq!(kw.text, "arabica");
    assert!(kw.aliases.contains("robusta"));
    assert_eq!(topic.total_keyword_weight(), 2.0);
}

#[test]
fn catalog_from_json_file() {
    let json = r#"{"topics":[{"id":"tea","name":"Tea","areas":[
        {"id":"leaves","name":"Leaves","keywords":[{"text":"green tea","weight":1.5}]}]}]}"#;
    let f = temp_file(".json", json);
    let cat = TopicCatalog::from_path(f.path()).unwrap();
    assert_eq!(cat.topic_ids(), vec!["tea".to_string()]);
}

#[test]
fn malformed_catalog_file_is_an_error() {
    let bad = SMALL_TOML.replace("weight = 2.0", "weight = -1.0");
    let f = temp_file(".toml", &bad);
    let err = TopicCatalog::from_path(f.path()).unwrap_err();
    let root = err
        .downcast_ref::<ScoringError>()
        .expect("validation error kept as source");
    assert!(matches!(root, ScoringError::InvalidCatalog { .. }));
}

#[test]
#[serial]
fn catalog_env_path_wins() {
    let f = temp_file(".toml", SMALL_TOML);
    let path = f.path().to_string_lossy().to_string();
    let _env = EnvSnapshot::set(&[(ENV_CATALOG_PATH, Some(path.as_str()))]);
    let cat = TopicCatalog::load_default().unwrap();
    assert_eq!(cat.topic_ids(), vec!["coffee".to_string()]);
}

#[test]
#[serial]
fn catalog_env_path_missing_file_fails() {
    let _env = EnvSnapshot::set(&[(ENV_CATALOG_PATH, Some("/definitely/not/here.toml"))]);
    assert!(TopicCatalog::load_default().is_err());
}

#[test]
#[serial]
fn scoring_config_file_then_env_overrides() {
    let f = temp_file(
        ".toml",
        r#"
semantic_threshold = 0.8
length_target_words = 25
aggregation = "max"

[oracle]
provider = "Disabled"
"#,
    );
    let path = f.path().to_string_lossy().to_string();
    let _env = EnvSnapshot::set(&[
        (ENV_SCORING_CONFIG_PATH, Some(path.as_str())),
        ("LENGTH_TARGET_WORDS", Some("30")),
        ("SEMANTIC_THRESHOLD", None),
        ("ORACLE_TIMEOUT_MS", None),
        ("AGGREGATION_POLICY", None),
    ]);
    let cfg = ScoringConfig::load_default().unwrap();
    assert!((cfg.semantic_threshold - 0.8).abs() < 1e-9);
    assert_eq!(cfg.length_target_words, 30);
    assert_eq!(cfg.aggregation, AggregationPolicy::Max);
    assert_eq!(cfg.oracle.provider, "disabled");
    assert_eq!(cfg.oracle_timeout_ms, 1500);
}

#[test]
#[serial]
fn engine_from_env_uses_configured_oracle() {
    let f = temp_file(".toml", "[oracle]\nprovider = \"disabled\"\n");
    let path = f.path().to_string_lossy().to_string();
    let _env = EnvSnapshot::set(&[
        (ENV_SCORING_CONFIG_PATH, Some(path.as_str())),
        (ENV_CATALOG_PATH, None),
    ]);
    let engine = topic_coverage::engine_from_env().unwrap();
    assert_eq!(engine.oracle_name(), "disabled");
    assert!(!engine.topic_ids().is_empty());
}
