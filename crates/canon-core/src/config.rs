//! # Engine Configuration
//!
//! Everything that varies between engine instances. Hosts typically
//! deserialize this from a TOML file; every field has a default, so an empty
//! file is a valid configuration.

use crate::error::CanonError;
use crate::primitives::{DEFAULT_CACHE_CAPACITY, DEFAULT_CANON_VERSION};
use crate::rules::rule_by_id;
use crate::verdict::StrictnessMode;
use serde::{Deserialize, Serialize};

/// Configuration of a [`CanonEngine`](crate::engine::CanonEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Version of the canon verdicts are stamped with and cached under.
    pub canon_version: String,
    /// Strict mode blocks realization on ERROR or FATAL; lenient only on FATAL.
    pub strict: bool,
    /// Permit `realize(.., skip_validation = true, ..)`.
    pub allow_bypass: bool,
    /// Verdicts retained by the cache. Zero disables caching.
    pub cache_capacity: usize,
    /// Rule ids excluded from validation.
    pub disabled_rules: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canon_version: DEFAULT_CANON_VERSION.to_string(),
            strict: true,
            allow_bypass: false,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            disabled_rules: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Strictness mode implied by `strict`.
    #[must_use]
    pub fn mode(&self) -> StrictnessMode {
        StrictnessMode::from_strict(self.strict)
    }

    /// Reject blank canon versions and unknown rule ids.
    pub fn validate(&self) -> Result<(), CanonError> {
        if self.canon_version.trim().is_empty() {
            return Err(CanonError::Config("canon_version must not be empty".to_string()));
        }
        for id in &self.disabled_rules {
            if rule_by_id(id).is_none() {
                return Err(CanonError::Config(format!("unknown rule id '{}'", id)));
            }
        }
        Ok(())
    }
}
