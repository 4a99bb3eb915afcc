//! # Findings and Verdicts
//!
//! Structured validation output:
//! - `Finding`: one rule observation with severity and canon-article citation
//! - `Verdict`: the ordered findings of one validation run, with counts,
//!   pass/fail under a strictness mode, the declaration signature and a timestamp
//!
//! Verdicts are immutable once created; the engine's cache hands out clones.

use crate::signature::Signature;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// SEVERITY
// =============================================================================

/// Gravity of a finding. Ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Structural breakage; nothing may be realized.
    Fatal,
    /// Canon violation; blocks realization in strict mode.
    Error,
    /// Advisory; never blocks.
    Warning,
    /// Observation only.
    Info,
}

impl Severity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fatal => "FATAL",
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
            Self::Info => "INFO",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// STRICTNESS
// =============================================================================

/// How severities translate to pass/fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrictnessMode {
    /// Blocks on ERROR or FATAL.
    #[default]
    Strict,
    /// Blocks only on FATAL.
    Lenient,
}

impl StrictnessMode {
    #[must_use]
    pub fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Lenient }
    }

    /// True if a finding of this severity blocks realization in this mode.
    #[must_use]
    pub fn blocks(&self, severity: Severity) -> bool {
        match self {
            Self::Strict => matches!(severity, Severity::Fatal | Severity::Error),
            Self::Lenient => severity == Severity::Fatal,
        }
    }
}

impl std::fmt::Display for StrictnessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Lenient => f.write_str("lenient"),
        }
    }
}

// =============================================================================
// FINDING
// =============================================================================

/// A single rule observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Id of the rule that produced the finding.
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    /// Canon article cited, e.g. `"Art. IX"`.
    pub canon_article: String,
    pub suggested_fix: Option<String>,
    /// Form, Trace, Relation or Constraint the finding is about.
    pub target_id: Option<String>,
}

impl Finding {
    #[must_use]
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        canon_article: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            canon_article: canon_article.into(),
            suggested_fix: None,
            target_id: None,
        }
    }

    #[must_use]
    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    #[must_use]
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {} ({})", self.severity, self.message, self.canon_article)?;
        if let Some(target) = &self.target_id {
            write!(f, " @ {}", target)?;
        }
        Ok(())
    }
}

// =============================================================================
// SEVERITY COUNTS
// =============================================================================

/// Number of findings per severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub fatal: usize,
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    /// Tally a slice of findings.
    #[must_use]
    pub fn tally(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            let slot = match finding.severity {
                Severity::Fatal => &mut counts.fatal,
                Severity::Error => &mut counts.error,
                Severity::Warning => &mut counts.warning,
                Severity::Info => &mut counts.info,
            };
            *slot = slot.saturating_add(1);
        }
        counts
    }

    #[must_use]
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Fatal => self.fatal,
            Severity::Error => self.error,
            Severity::Warning => self.warning,
            Severity::Info => self.info,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.fatal
            .saturating_add(self.error)
            .saturating_add(self.warning)
            .saturating_add(self.info)
    }
}

// =============================================================================
// VERDICT
// =============================================================================

/// The outcome of validating one declaration against the canon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    findings: Vec<Finding>,
    counts: SeverityCounts,
    passed: bool,
    mode: StrictnessMode,
    signature: Signature,
    canon_version: String,
    timestamp: DateTime<Utc>,
}

impl Verdict {
    /// Assemble a verdict. Counts and pass/fail are derived from `findings`.
    #[must_use]
    pub fn new(
        findings: Vec<Finding>,
        mode: StrictnessMode,
        signature: Signature,
        canon_version: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let counts = SeverityCounts::tally(&findings);
        let passed = !findings.iter().any(|f| mode.blocks(f.severity));
        Self {
            findings,
            counts,
            passed,
            mode,
            signature,
            canon_version: canon_version.into(),
            timestamp,
        }
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn counts(&self) -> SeverityCounts {
        self.counts
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn mode(&self) -> StrictnessMode {
        self.mode
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn canon_version(&self) -> &str {
        &self.canon_version
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Findings of exactly this severity.
    pub fn findings_with(&self, severity: Severity) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.severity == severity)
    }

    /// Findings produced by one rule.
    pub fn findings_for_rule<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a Finding> {
        self.findings.iter().filter(move |f| f.rule_id == rule_id)
    }

    /// Would this verdict pass under another mode?
    #[must_use]
    pub fn passes_under(&self, mode: StrictnessMode) -> bool {
        !self.findings.iter().any(|f| mode.blocks(f.severity))
    }
}

// =============================================================================
// TESTS
// =============================================================================
