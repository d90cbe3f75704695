// src/config/oracle.rs
use serde::{Deserialize, Serialize};
use std::env;

fn default_provider() -> String {
    "lexical".to_string()
}
fn default_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// "lexical" | "openai" | "disabled" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// Embedding model for the "openai" provider.
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            base_url: default_base_url(),
        }
    }
}

impl OracleConfig {
    /// Lower-case the provider and resolve an "ENV" api key.
    ///
    /// A missing key is not an error here: the embedding oracle reports itself
    /// unavailable and turns degrade to lexical-only scoring.
    pub fn resolved(mut self) -> Self {
        self.provider = self.provider.trim().to_lowercase();
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn resolves_env_key_and_normalizes_provider() {
        env::set_var("OPENAI_API_KEY", "sk-test");
        let cfg = OracleConfig {
            provider: " OpenAI ".into(),
            base_url: "http://localhost:9000/v1/".into(),
            ..Default::default()
        }
        .resolved();
        env::remove_var("OPENAI_API_KEY");

        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.api_key, "sk-test");
        assert_eq!(cfg.base_url, "http://localhost:9000/v1");
    }

    #[test]
    fn explicit_key_is_kept() {
        let cfg = OracleConfig {
            api_key: "sk-inline".into(),
            ..Default::default()
        }
        .resolved();
        assert_eq!(cfg.api_key, "sk-inline");
        assert_eq!(cfg.provider, "lexical");
    }
}
