//! # Error Types
//!
//! - No silent failures
//! - Use `Result<T, CanonError>` for fallible engine operations
//! - Per-form realization failures (`MissingRealizerError`, `RealizationError`)
//!   are collected into a `RealizeResult` instead of aborting the batch
//! - The core never panics

use crate::signature::Signature;
use crate::verdict::{SeverityCounts, Verdict};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `realize()` refused to run because the declaration failed validation.
///
/// Raised before any realizer is invoked. Never retried automatically.
#[derive(Debug, Clone, Error)]
#[error(
    "declaration {} failed canon validation: {} fatal, {} error",
    .verdict.signature().short(),
    .verdict.counts().fatal,
    .verdict.counts().error
)]
pub struct CanonValidationError {
    /// The failing verdict.
    pub verdict: Box<Verdict>,
}

/// Validation was skipped while the engine forbids bypass.
#[derive(Debug, Clone, Error)]
#[error("canon bypass requested for {} but bypass is disabled", .signature.short())]
pub struct CanonBypassError {
    pub signature: Signature,
}

/// Audit record attached to a `RealizeResult` produced through a bypass.
///
/// Not an error: the realization went ahead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonBypassWarning {
    pub signature: Signature,
    pub canon_version: String,
    /// Whether the skipped verdict would have passed under the engine's mode.
    pub verdict_passed: bool,
    pub counts: SeverityCounts,
}

impl std::fmt::Display for CanonBypassWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "canon bypass used for {} (canon {}, verdict {}: {} fatal, {} error)",
            self.signature.short(),
            self.canon_version,
            if self.verdict_passed { "passed" } else { "failed" },
            self.counts.fatal,
            self.counts.error
        )
    }
}

/// No realizer is registered for a form's kind.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("no realizer registered for kind '{kind}' (form '{form_id}')")]
pub struct MissingRealizerError {
    pub form_id: String,
    pub kind: String,
}

/// A solver could not derive a canonical parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum UnsolvableError {
    /// The solver does not recognize the key.
    #[error("unrecognized key '{0}'")]
    UnknownKey(String),

    /// The value violates the shape's constraints.
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// A realizer hit a domain-level numeric or geometric failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("realization of form '{form_id}' failed: {reason}")]
pub struct RealizationError {
    pub form_id: String,
    pub reason: String,
}

impl RealizationError {
    #[must_use]
    pub fn new(form_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            form_id: form_id.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the canon engine.
#[derive(Debug, Error)]
pub enum CanonError {
    /// The declaration failed validation under the active strictness mode.
    #[error(transparent)]
    Validation(#[from] CanonValidationError),

    /// Validation was skipped while bypass is disabled.
    #[error(transparent)]
    Bypass(#[from] CanonBypassError),

    /// A realizer is already registered for this kind.
    #[error("realizer already registered for kind '{0}'")]
    DuplicateRealizer(String),

    /// A solver is already registered for this kind.
    #[error("solver already registered for kind '{0}'")]
    DuplicateSolver(String),

    /// No solver is registered for this kind.
    #[error("no solver registered for kind '{0}'")]
    MissingSolver(String),

    /// A solver rejected its input.
    #[error("unsolvable: {0}")]
    Unsolvable(#[from] UnsolvableError),

    /// Canonical encoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Engine configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred in a host.
    #[error("I/O error: {0}")]
    Io(String),
}

impl CanonError {
    /// The failing verdict, if this is a validation error.
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            Self::Validation(e) => Some(e.verdict.as_ref()),
            _ => None,
        }
    }
}
