//! # canon-core
//!
//! The Canon engine - declarative validation before realization.
//!
//! A `Declaration` describes geometry as an immutable tree of Forms,
//! Relations, Traces, invariant constraints and test requests. The engine
//! checks it against a fixed canon of nine rules, produces a `Verdict`, and
//! only then hands Forms to host-registered realizers.
//!
//! ## Architectural Constraints
//!
//! - The canon is closed: rules are compiled in, configuration may only
//!   disable them
//! - Deterministic: same declaration, same signature, same findings in the
//!   same order
//! - No async, no network, no filesystem (pure Rust)
//! - Concrete geometry lives outside the core, behind `Solver` and `Realizer`

// =============================================================================
// MODULES
// =============================================================================

pub mod articles;
pub mod config;
pub mod engine;
pub mod error;
pub mod plugin;
pub mod primitives;
pub mod report;
pub mod rules;
pub mod signature;
pub mod types;
pub mod verdict;

// =============================================================================
// RE-EXPORTS: Declaration AST
// =============================================================================

pub use types::{
    CanonTestRequest, ClosureStatus, ConstraintExpr, Declaration, Form, InvariantConstraint,
    ParamMap, ParamValue, Relation, Trace,
};

// =============================================================================
// RE-EXPORTS: Validation
// =============================================================================

pub use articles::{Article, ArticleTable};
pub use config::EngineConfig;
pub use report::render_summary;
pub use rules::{CANON_RULES, RuleSpec, rule_by_id};
pub use signature::{Signature, compute_signature};
pub use verdict::{Finding, Severity, SeverityCounts, StrictnessMode, Verdict};

// =============================================================================
// RE-EXPORTS: Engine and Plugins
// =============================================================================

pub use engine::{CanonEngine, RealizeFailure, RealizeResult};
pub use error::{
    CanonBypassError, CanonBypassWarning, CanonError, CanonValidationError, MissingRealizerError,
    RealizationError, UnsolvableError,
};
pub use plugin::{
    Artifact, FormRealization, Provenance, RealizeContext, Realizer, SolveResult, Solver,
};
