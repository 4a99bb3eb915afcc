//! # Solver and Realizer Interfaces
//!
//! The two plugin seams of the engine. The core owns the traits; concrete
//! geometric solvers and realizers live in the host and are registered into
//! a [`CanonEngine`](crate::engine::CanonEngine) at startup.
//!
//! - `Solver`: derives canonical parameters from partial or alternate input
//!   (e.g. a circle's radius from its circumference)
//! - `Realizer`: turns a validated Form into a concrete [`Artifact`]
//!
//! Both must be `Send + Sync` and stateless. The core never implements
//! either for a concrete shape.

use crate::error::{RealizationError, UnsolvableError};
use crate::types::{Form, ParamMap, ParamValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// SOLVER
// =============================================================================

/// Outcome of a solve: the canonical parameter plus everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveResult {
    /// Name of the canonical parameter, e.g. `"radius"`.
    pub canonical_key: String,
    /// Value of the canonical parameter.
    pub value: f64,
    /// Other parameters derived alongside it, e.g. `diameter`, `area`.
    pub derived: BTreeMap<String, f64>,
    /// Human-readable derivation steps.
    pub notes: Vec<String>,
}

impl SolveResult {
    #[must_use]
    pub fn new(canonical_key: impl Into<String>, value: f64) -> Self {
        Self {
            canonical_key: canonical_key.into(),
            value,
            derived: BTreeMap::new(),
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_derived(mut self, key: impl Into<String>, value: f64) -> Self {
        self.derived.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Build a Form carrying the canonical parameter and every derived one.
    ///
    /// This is how solver chains construct declarations.
    #[must_use]
    pub fn to_form(&self, id: impl Into<String>, kind: impl Into<String>) -> Form {
        let mut params: ParamMap = self
            .derived
            .iter()
            .map(|(k, v)| (k.clone(), ParamValue::Float(*v)))
            .collect();
        params.insert(self.canonical_key.clone(), ParamValue::Float(self.value));
        Form::new(id, kind).with_params(params)
    }
}

/// Bidirectional parameter solving for one geometric kind.
pub trait Solver: Send + Sync {
    /// Keys this solver accepts as input.
    fn supported_keys(&self) -> &[&str];

    /// Derive the canonical parameter from `key = value`.
    ///
    /// Fails with `UnsolvableError::UnknownKey` for an unsupported key and
    /// `UnsolvableError::InvalidValue` when the value violates the shape
    /// (a negative length, a non-finite number).
    fn solve_from(&self, key: &str, value: f64) -> Result<SolveResult, UnsolvableError>;
}

// =============================================================================
// REALIZER
// =============================================================================

/// Host-supplied context for a realization run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RealizeContext {
    /// Tolerance realizers should honor. The engine fills this from the
    /// declaration when the host leaves it unset.
    pub epsilon: Option<f64>,
    /// Free-form options (resolution, units, ...).
    pub options: ParamMap,
}

impl RealizeContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&ParamValue> {
        self.options.get(key)
    }
}

/// A computed geometric artifact.
///
/// Vertices are points of any dimension; edges index into `vertices`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Artifact {
    pub vertices: Vec<Vec<f64>>,
    pub edges: Vec<(usize, usize)>,
    /// Scalar measures, e.g. `area`, `perimeter`, `volume`.
    pub measures: BTreeMap<String, f64>,
}

impl Artifact {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_vertex(mut self, vertex: Vec<f64>) -> Self {
        self.vertices.push(vertex);
        self
    }

    #[must_use]
    pub fn with_edge(mut self, from: usize, to: usize) -> Self {
        self.edges.push((from, to));
        self
    }

    #[must_use]
    pub fn with_measure(mut self, name: impl Into<String>, value: f64) -> Self {
        self.measures.insert(name.into(), value);
        self
    }

    /// True if no vertices, edges or measures were produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.edges.is_empty() && self.measures.is_empty()
    }

    /// True if every edge indexes an existing vertex.
    #[must_use]
    pub fn edges_in_bounds(&self) -> bool {
        let n = self.vertices.len();
        self.edges.iter().all(|&(a, b)| a < n && b < n)
    }
}

/// Where an artifact came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Provenance {
    /// Name reported by the realizer.
    pub realizer: String,
    pub notes: Vec<String>,
}

/// A realized Form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormRealization {
    pub form_id: String,
    pub kind: String,
    pub artifact: Artifact,
    pub provenance: Provenance,
}

impl FormRealization {
    #[must_use]
    pub fn new(form: &Form, artifact: Artifact, realizer: impl Into<String>) -> Self {
        Self {
            form_id: form.id().to_string(),
            kind: form.kind().to_string(),
            artifact,
            provenance: Provenance {
                realizer: realizer.into(),
                notes: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.provenance.notes.push(note.into());
        self
    }
}

/// Forward realization of one geometric kind.
///
/// A realizer is only ever handed Forms that passed validation under the
/// engine's strictness mode, or Forms of an audited bypass.
pub trait Realizer: Send + Sync {
    /// Name recorded in provenance.
    fn name(&self) -> &str;

    /// Compute the artifact for a Form.
    ///
    /// Fails with `RealizationError` for degenerate or numerically
    /// unrealizable parameters.
    fn realize_form(
        &self,
        form: &Form,
        context: &RealizeContext,
    ) -> Result<FormRealization, RealizationError>;
}

// =============================================================================
// TESTS
// =============================================================================
