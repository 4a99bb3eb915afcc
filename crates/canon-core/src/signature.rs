//! # Declaration Signatures
//!
//! A signature is the BLAKE3 digest of a declaration's canonical form. It is
//! the verdict cache key and the provenance stamp on every `Verdict` and
//! `RealizeResult`.
//!
//! ## Canonicalization
//!
//! Lowering a [`Declaration`] to its canonical form:
//! - Forms and Traces are sorted by id (ties broken by full content)
//! - Relations, Constraints and Tests are sorted by full canonical content
//! - Constraint scopes and claimed invariants are sorted sets
//! - Parameter maps and metadata are key-ordered `BTreeMap`s
//! - Numbers render losslessly: integral values as plain integers (so `5`
//!   and `5.0` agree, `-0` folds to `0`), everything else in the shortest
//!   text that round-trips to the same `f64`
//! - Non-finite numbers render as `nan`, `inf`, `-inf`
//!
//! Rules never distinguish values that share a canonical form; parameter
//! comparisons in rules go through [`params_equivalent`].
//!
//! The canonical form is encoded with `postcard` behind [`SIGNATURE_MAGIC`]
//! and [`SIGNATURE_FORMAT_VERSION`], then hashed.

use crate::error::CanonError;
use crate::primitives::{SIGNATURE_FORMAT_VERSION, SIGNATURE_MAGIC};
use crate::types::{
    CanonTestRequest, ConstraintExpr, Declaration, Form, InvariantConstraint, ParamMap,
    ParamValue, Relation, Trace,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// SIGNATURE
// =============================================================================

/// Lowercase hex BLAKE3 digest of a canonical declaration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// Wrap an existing hex digest.
    #[must_use]
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> &str {
        self.0.get(..12).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CANONICAL VALUES
// =============================================================================

/// A parameter value with numbers normalized to canonical decimal text.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
enum CanonicalValue {
    Bool(bool),
    Number(String),
    Text(String),
    List(Vec<CanonicalValue>),
}

impl From<&ParamValue> for CanonicalValue {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::Bool(b) => Self::Bool(*b),
            ParamValue::Int(i) => Self::Number(i.to_string()),
            ParamValue::Float(f) => Self::Number(canonical_number(*f)),
            ParamValue::Text(s) => Self::Text(s.clone()),
            ParamValue::List(items) => Self::List(items.iter().map(Self::from).collect()),
        }
    }
}

fn canonical_params(params: &ParamMap) -> BTreeMap<String, CanonicalValue> {
    params
        .iter()
        .map(|(k, v)| (k.clone(), CanonicalValue::from(v)))
        .collect()
}

/// True if two parameter maps lower to the same canonical form.
#[must_use]
pub fn params_equivalent(a: &ParamMap, b: &ParamMap) -> bool {
    a.len() == b.len() && canonical_params(a) == canonical_params(b)
}

/// Render a number losslessly for hashing.
///
/// ```
/// use canon_core::signature::canonical_number;
/// assert_eq!(canonical_number(5.0), "5");
/// assert_eq!(canonical_number(0.001), "0.001");
/// assert_eq!(canonical_number(-0.0), "0");
/// assert_ne!(canonical_number(1e-13), canonical_number(0.0));
/// ```
#[must_use]
pub fn canonical_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() { "inf" } else { "-inf" }.to_string();
    }
    if value.fract() == 0.0 {
        // Integral: same text as the equal i64, and `-0` collapses to `0`.
        let text = format!("{:.0}", value);
        return if text == "-0" { "0".to_string() } else { text };
    }
    // Shortest representation that parses back to the same f64.
    format!("{:?}", value)
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
enum CanonicalExpr {
    Literal(CanonicalValue),
    Ref { target: String, param: String },
    Op { op: String, args: Vec<CanonicalExpr> },
}

impl From<&ConstraintExpr> for CanonicalExpr {
    fn from(expr: &ConstraintExpr) -> Self {
        match expr {
            ConstraintExpr::Literal(v) => Self::Literal(CanonicalValue::from(v)),
            ConstraintExpr::Ref { target, param } => Self::Ref {
                target: target.clone(),
                param: param.clone(),
            },
            ConstraintExpr::Op { op, args } => Self::Op {
                op: op.clone(),
                args: args.iter().map(Self::from).collect(),
            },
        }
    }
}

// =============================================================================
// CANONICAL NODES
// =============================================================================

#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
struct CanonicalForm {
    id: String,
    kind: String,
    params: BTreeMap<String, CanonicalValue>,
    orientation: Option<String>,
    symmetry_class: Option<String>,
    curvature_class: Option<String>,
    dimensional_class: Option<String>,
    iteration_depth: Option<u32>,
    truncated: bool,
    notes: String,
}

impl From<&Form> for CanonicalForm {
    fn from(form: &Form) -> Self {
        Self {
            id: form.id().to_string(),
            kind: form.kind().to_string(),
            params: canonical_params(form.params()),
            orientation: form.orientation().map(str::to_string),
            symmetry_class: form.symmetry_class().map(str::to_string),
            curvature_class: form.curvature_class().map(str::to_string),
            dimensional_class: form.dimensional_class().map(str::to_string),
            iteration_depth: form.iteration_depth(),
            truncated: form.is_truncated(),
            notes: form.notes().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
struct CanonicalRelation {
    kind: String,
    a: String,
    b: String,
    params: BTreeMap<String, CanonicalValue>,
    notes: String,
}

impl From<&Relation> for CanonicalRelation {
    fn from(rel: &Relation) -> Self {
        Self {
            kind: rel.kind().to_string(),
            a: rel.a().to_string(),
            b: rel.b().to_string(),
            params: canonical_params(rel.params()),
            notes: rel.notes().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
struct CanonicalTrace {
    id: String,
    kind: String,
    source_form: Option<String>,
    frame: Option<String>,
    params: BTreeMap<String, CanonicalValue>,
    invariants_claimed: Vec<String>,
    void_type: Option<String>,
    closure_status: &'static str,
    notes: String,
}

impl From<&Trace> for CanonicalTrace {
    fn from(trace: &Trace) -> Self {
        Self {
            id: trace.id().to_string(),
            kind: trace.kind().to_string(),
            source_form: trace.source_form().map(str::to_string),
            frame: trace.frame().map(str::to_string),
            params: canonical_params(trace.params()),
            invariants_claimed: trace.invariants_claimed().iter().cloned().collect(),
            void_type: trace.void_type().map(str::to_string),
            closure_status: trace.closure_status().as_str(),
            notes: trace.notes().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
struct CanonicalConstraint {
    name: String,
    expr: CanonicalExpr,
    scope: Vec<String>,
    epsilon: Option<String>,
    notes: String,
}

impl From<&InvariantConstraint> for CanonicalConstraint {
    fn from(c: &InvariantConstraint) -> Self {
        let mut scope: Vec<String> = c.scope().to_vec();
        scope.sort();
        scope.dedup();
        Self {
            name: c.name().to_string(),
            expr: CanonicalExpr::from(c.expr()),
            scope,
            epsilon: c.epsilon().map(canonical_number),
            notes: c.notes().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord)]
struct CanonicalTest {
    name: String,
    target: String,
    params: BTreeMap<String, CanonicalValue>,
}

impl From<&CanonTestRequest> for CanonicalTest {
    fn from(t: &CanonTestRequest) -> Self {
        Self {
            name: t.name().to_string(),
            target: t.target().to_string(),
            params: canonical_params(t.params()),
        }
    }
}

// =============================================================================
// CANONICAL DECLARATION
// =============================================================================

/// The order-independent lowering of a [`Declaration`] that gets hashed.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CanonicalDeclaration {
    magic: [u8; 4],
    version: u8,
    title: String,
    forms: Vec<CanonicalForm>,
    relations: Vec<CanonicalRelation>,
    traces: Vec<CanonicalTrace>,
    constraints: Vec<CanonicalConstraint>,
    tests: Vec<CanonicalTest>,
    metadata: BTreeMap<String, String>,
    epsilon: Option<String>,
}

fn sorted<T: Ord, S, F: Fn(&S) -> T>(items: &[S], f: F) -> Vec<T> {
    let mut out: Vec<T> = items.iter().map(f).collect();
    out.sort();
    out
}

impl CanonicalDeclaration {
    /// Lower a declaration to canonical form.
    #[must_use]
    pub fn from_declaration(decl: &Declaration) -> Self {
        Self {
            magic: *SIGNATURE_MAGIC,
            version: SIGNATURE_FORMAT_VERSION,
            title: decl.title().to_string(),
            forms: sorted(decl.forms(), |x| CanonicalForm::from(x)),
            relations: sorted(decl.relations(), |x| CanonicalRelation::from(x)),
            traces: sorted(decl.traces(), |x| CanonicalTrace::from(x)),
            constraints: sorted(decl.constraints(), |x| CanonicalConstraint::from(x)),
            tests: sorted(decl.tests(), |x| CanonicalTest::from(x)),
            metadata: decl.metadata().clone(),
            epsilon: decl.epsilon().map(canonical_number),
        }
    }

    /// Encode to the exact bytes that get hashed.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CanonError> {
        postcard::to_allocvec(self).map_err(|e| CanonError::Serialization(e.to_string()))
    }
}

/// Compute the signature of a declaration.
pub fn compute_signature(decl: &Declaration) -> Result<Signature, CanonError> {
    let bytes = CanonicalDeclaration::from_declaration(decl).to_bytes()?;
    Ok(Signature(blake3::hash(&bytes).to_hex().to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
