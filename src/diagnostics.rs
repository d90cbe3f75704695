// src/diagnostics.rs
//! Dev-only turn diagnostics. Raw utterances are never logged, only a short hash.

use sha2::{Digest, Sha256};
use tracing::info;

pub const ENV_DEV_LOG: &str = "COVERAGE_DEV_LOG";
pub const ENV_APP_ENV: &str = "APP_ENV";

/// Keywords / areas listed per dev log line.
const DEV_LOG_LIST_MAX: usize = 5;

/// Per-turn detail only goes out when `COVERAGE_DEV_LOG` is set and the build or
/// `APP_ENV` says we are not in production.
pub(crate) fn dev_logging_enabled() -> bool {
    let flag = std::env::var(ENV_DEV_LOG).unwrap_or_default();
    let app_env = std::env::var(ENV_APP_ENV).unwrap_or_default();
    dev_gate(&flag, &app_env, cfg!(debug_assertions))
}

fn dev_gate(flag: &str, app_env: &str, debug_build: bool) -> bool {
    let on = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes");
    let dev_env = matches!(
        app_env.trim().to_ascii_lowercase().as_str(),
        "local" | "development" | "dev"
    );
    on && (debug_build || dev_env)
}

/// First 6 bytes of SHA-256 as hex; stable id for an utterance in logs.
pub fn anon_hash(text: &str) -> String {
    Sha256::digest(text.as_bytes())[..6]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// What a scored turn looked like, without its text.
pub(crate) struct TurnTrace<'a> {
    pub session_id: &'a str,
    pub utterance_id: String,
    pub matched: &'a [String],
    pub newly_covered: &'a [String],
    pub total: f64,
    pub degraded: bool,
}

impl TurnTrace<'_> {
    pub(crate) fn emit(&self) {
        if !dev_logging_enabled() {
            return;
        }
        info!(
            target: "coverage",
            session_id = self.session_id,
            utterance = %self.utterance_id,
            total = self.total,
            degraded = self.degraded,
            matched = ?head(self.matched),
            newly_covered = ?head(self.newly_covered),
            "dev turn trace"
        );
    }
}

fn head(items: &[String]) -> &[String] {
    &items[..items.len().min(DEV_LOG_LIST_MAX)]
}
