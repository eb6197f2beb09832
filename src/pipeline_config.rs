//! Scenario pipeline configuration.
//!
//! Defaults are safe for offline use: refinement is off and the decision cap
//! is 20. Each value can be overridden from the environment.

use serde::{Deserialize, Serialize};

use crate::pipeline::decisions::DEFAULT_MAX_INITIAL_DECISIONS;

pub const ENV_MAX_DECISIONS: &str = "CASE_TIMELINE_MAX_DECISIONS";
pub const ENV_REFINE: &str = "CASE_TIMELINE_REFINE";
pub const ENV_OLLAMA_URL: &str = "CASE_TIMELINE_OLLAMA_URL";
pub const ENV_MODEL: &str = "CASE_TIMELINE_MODEL";
pub const ENV_LLM_TIMEOUT: &str = "CASE_TIMELINE_LLM_TIMEOUT";

/// Identifier stamped on every scenario version this build produces.
pub const PIPELINE_VERSION: &str = concat!("timeline-", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Off by default. When off, lexical decisions are final.
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:11434".into(),
            model: "llama3".into(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Decision candidates kept after pruning.
    pub max_initial_decisions: usize,
    pub pipeline_version: String,
    pub refinement: RefinementConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_initial_decisions: DEFAULT_MAX_INITIAL_DECISIONS,
            pipeline_version: PIPELINE_VERSION.into(),
            refinement: RefinementConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `CASE_TIMELINE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns. Unparseable values
    /// are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(n) = parsed(&lookup, ENV_MAX_DECISIONS) {
            config.max_initial_decisions = n;
        }
        if let Some(raw) = lookup(ENV_REFINE) {
            config.refinement.enabled = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        if let Some(url) = lookup(ENV_OLLAMA_URL).filter(|s| !s.trim().is_empty()) {
            config.refinement.base_url = url.trim().to_string();
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|s| !s.trim().is_empty()) {
            config.refinement.model = model.trim().to_string();
        }
        if let Some(secs) = parsed(&lookup, ENV_LLM_TIMEOUT) {
            config.refinement.timeout_secs = secs;
        }

        config
    }
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}
