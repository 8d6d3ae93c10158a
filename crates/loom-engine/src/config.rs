//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::narration::NarratorConfig;

/// Tunables for a game session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Collaborator intents below this confidence are ambiguous.
    pub ambiguity_threshold: f64,
    /// Minimum Jaro-Winkler similarity for fuzzy name matches.
    pub fuzzy_threshold: f64,
    /// How long to wait for the prose collaborator.
    pub narration_timeout_ms: u64,
    /// Fallback narrator settings.
    pub narrator: NarratorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ambiguity_threshold: 0.6,
            fuzzy_threshold: 0.8,
            narration_timeout_ms: 5000,
            narrator: NarratorConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a config from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> EngineResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Set the ambiguity threshold (clamped to 0.0-1.0).
    pub fn with_ambiguity_threshold(mut self, threshold: f64) -> Self {
        self.ambiguity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the fuzzy-match threshold (clamped to 0.0-1.0).
    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Set the narration timeout.
    pub fn with_narration_timeout(mut self, timeout: Duration) -> Self {
        self.narration_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The narration timeout as a [`Duration`].
    pub fn narration_timeout(&self) -> Duration {
        Duration::from_millis(self.narration_timeout_ms)
    }
}
