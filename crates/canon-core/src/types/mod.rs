//! # Declaration AST
//!
//! This module contains the immutable value types a caller assembles into a
//! [`Declaration`]:
//! - Parameter values (`ParamValue`, `ParamMap`)
//! - Geometric nodes (`Form`, `Relation`, `Trace`)
//! - Constraints and test requests (`InvariantConstraint`, `ConstraintExpr`, `CanonTestRequest`)
//!
//! ## Immutability
//!
//! Every field is private. Values are built with consuming `with_*` methods,
//! so an "edit" always produces a new value and a shared `&Declaration` can
//! never change underneath a cached signature.
//!
//! Kinds are open string tags: new geometric kinds are introduced by external
//! realizers the core never sees. Only genuinely fixed vocabularies
//! (`ClosureStatus`, `Severity`) are closed enums.

mod declaration;

pub use declaration::Declaration;

use crate::primitives::NUMERIC_OPERATORS;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// PARAMETER VALUES
// =============================================================================

/// A single parameter value attached to a Form, Relation, Trace or test.
///
/// Deserialized untagged so that JSON `true`, `5`, `5.0`, `"cw"` and `[1, 2]`
/// load without wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer quantity.
    Int(i64),
    /// Floating-point quantity.
    Float(f64),
    /// Free text.
    Text(String),
    /// Ordered list of values.
    List(Vec<ParamValue>),
}

impl ParamValue {
    /// Numeric view of the value, if it is an integer or a float.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Text view of the value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view of the value.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// True for `Int` and `Float`.
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(v: Vec<ParamValue>) -> Self {
        Self::List(v)
    }
}

/// Parameter map with a fixed (sorted) key order.
pub type ParamMap = BTreeMap<String, ParamValue>;

// =============================================================================
// FORM
// =============================================================================

/// A declared geometric form.
///
/// `id` must be unique across the Forms and Traces of its Declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Form {
    id: String,
    kind: String,
    #[serde(default)]
    params: ParamMap,
    #[serde(default)]
    orientation: Option<String>,
    #[serde(default)]
    symmetry_class: Option<String>,
    #[serde(default)]
    curvature_class: Option<String>,
    #[serde(default)]
    dimensional_class: Option<String>,
    #[serde(default)]
    iteration_depth: Option<u32>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    notes: String,
}

impl Form {
    /// Create a form with no parameters and no optional declarations.
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            params: ParamMap::new(),
            orientation: None,
            symmetry_class: None,
            curvature_class: None,
            dimensional_class: None,
            iteration_depth: None,
            truncated: false,
            notes: String::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: ParamMap) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_orientation(mut self, orientation: impl Into<String>) -> Self {
        self.orientation = Some(orientation.into());
        self
    }

    #[must_use]
    pub fn with_symmetry_class(mut self, class: impl Into<String>) -> Self {
        self.symmetry_class = Some(class.into());
        self
    }

    #[must_use]
    pub fn with_curvature_class(mut self, class: impl Into<String>) -> Self {
        self.curvature_class = Some(class.into());
        self
    }

    #[must_use]
    pub fn with_dimensional_class(mut self, class: impl Into<String>) -> Self {
        self.dimensional_class = Some(class.into());
        self
    }

    #[must_use]
    pub fn with_iteration_depth(mut self, depth: u32) -> Self {
        self.iteration_depth = Some(depth);
        self
    }

    #[must_use]
    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    /// Look up a single parameter.
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn orientation(&self) -> Option<&str> {
        self.orientation.as_deref()
    }

    pub fn symmetry_class(&self) -> Option<&str> {
        self.symmetry_class.as_deref()
    }

    pub fn curvature_class(&self) -> Option<&str> {
        self.curvature_class.as_deref()
    }

    pub fn dimensional_class(&self) -> Option<&str> {
        self.dimensional_class.as_deref()
    }

    pub fn iteration_depth(&self) -> Option<u32> {
        self.iteration_depth
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }
}

// =============================================================================
// RELATION
// =============================================================================

/// A declared relationship between two Forms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    kind: String,
    a: String,
    b: String,
    #[serde(default)]
    params: ParamMap,
    #[serde(default)]
    notes: String,
}

impl Relation {
    #[must_use]
    pub fn new(kind: impl Into<String>, a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            a: a.into(),
            b: b.into(),
            params: ParamMap::new(),
            notes: String::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn a(&self) -> &str {
        &self.a
    }

    pub fn b(&self) -> &str {
        &self.b
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// True if this relation links `x` and `y` in either direction.
    pub fn links(&self, x: &str, y: &str) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }
}

// =============================================================================
// TRACE
// =============================================================================

/// Whether a motion-revealed trace closes on itself.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ClosureStatus {
    /// The trace leaves a void that must be classified.
    Open,
    /// The trace returns to its origin.
    Closed,
    /// Closure has not been established.
    #[default]
    Undetermined,
}

impl ClosureStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Undetermined => "undetermined",
        }
    }
}

impl std::fmt::Display for ClosureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A figure revealed by moving a Form through a frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    id: String,
    kind: String,
    #[serde(default)]
    source_form: Option<String>,
    #[serde(default)]
    frame: Option<String>,
    #[serde(default)]
    params: ParamMap,
    #[serde(default)]
    invariants_claimed: BTreeSet<String>,
    #[serde(default)]
    void_type: Option<String>,
    #[serde(default)]
    closure_status: ClosureStatus,
    #[serde(default)]
    notes: String,
}

impl Trace {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            source_form: None,
            frame: None,
            params: ParamMap::new(),
            invariants_claimed: BTreeSet::new(),
            void_type: None,
            closure_status: ClosureStatus::default(),
            notes: String::new(),
        }
    }

    #[must_use]
    pub fn with_source_form(mut self, form_id: impl Into<String>) -> Self {
        self.source_form = Some(form_id.into());
        self
    }

    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.frame = Some(frame.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_invariant(mut self, invariant: impl Into<String>) -> Self {
        self.invariants_claimed.insert(invariant.into());
        self
    }

    #[must_use]
    pub fn with_void_type(mut self, void_type: impl Into<String>) -> Self {
        self.void_type = Some(void_type.into());
        self
    }

    #[must_use]
    pub fn with_closure_status(mut self, status: ClosureStatus) -> Self {
        self.closure_status = status;
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn source_form(&self) -> Option<&str> {
        self.source_form.as_deref()
    }

    pub fn frame(&self) -> Option<&str> {
        self.frame.as_deref()
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }

    pub fn invariants_claimed(&self) -> &BTreeSet<String> {
        &self.invariants_claimed
    }

    pub fn void_type(&self) -> Option<&str> {
        self.void_type.as_deref()
    }

    pub fn closure_status(&self) -> ClosureStatus {
        self.closure_status
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }
}

// =============================================================================
// CONSTRAINTS
// =============================================================================

/// Structured operator/operand expression of an invariant constraint.
///
/// Serialized externally tagged:
/// `{"op": {"op": "eq", "args": [{"ref": {"target": "f1", "param": "radius"}}, {"literal": 5}]}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintExpr {
    /// A constant operand.
    Literal(ParamValue),
    /// A parameter of a Form or Trace.
    Ref { target: String, param: String },
    /// An operator applied to sub-expressions.
    Op {
        op: String,
        #[serde(default)]
        args: Vec<ConstraintExpr>,
    },
}

impl ConstraintExpr {
    #[must_use]
    pub fn literal(value: impl Into<ParamValue>) -> Self {
        Self::Literal(value.into())
    }

    #[must_use]
    pub fn reference(target: impl Into<String>, param: impl Into<String>) -> Self {
        Self::Ref {
            target: target.into(),
            param: param.into(),
        }
    }

    #[must_use]
    pub fn op(op: impl Into<String>, args: Vec<ConstraintExpr>) -> Self {
        Self::Op {
            op: op.into(),
            args,
        }
    }

    /// True if the expression compares or combines numbers anywhere.
    ///
    /// An expression is numeric when it contains a numeric literal or an
    /// operator from [`NUMERIC_OPERATORS`].
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Literal(v) => literal_is_numeric(v),
            Self::Ref { .. } => false,
            Self::Op { op, args } => {
                NUMERIC_OPERATORS
                    .iter()
                    .any(|n| n.eq_ignore_ascii_case(op))
                    || args.iter().any(ConstraintExpr::is_numeric)
            }
        }
    }

    /// Every Form/Trace id referenced by a `Ref` operand, in traversal order.
    #[must_use]
    pub fn referenced_ids(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Ref { target, .. } => out.push(target),
            Self::Op { args, .. } => {
                for arg in args {
                    arg.collect_refs(out);
                }
            }
        }
    }
}

fn literal_is_numeric(value: &ParamValue) -> bool {
    match value {
        ParamValue::List(items) => items.iter().any(literal_is_numeric),
        other => other.is_numeric(),
    }
}

/// A named invariant asserted over a set of Forms and Traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvariantConstraint {
    name: String,
    expr: ConstraintExpr,
    #[serde(default)]
    scope: Vec<String>,
    #[serde(default)]
    epsilon: Option<f64>,
    #[serde(default)]
    notes: String,
}

impl InvariantConstraint {
    #[must_use]
    pub fn new(name: impl Into<String>, expr: ConstraintExpr) -> Self {
        Self {
            name: name.into(),
            expr,
            scope: Vec::new(),
            epsilon: None,
            notes: String::new(),
        }
    }

    #[must_use]
    pub fn with_scope<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Declare a tolerance local to this constraint.
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expr(&self) -> &ConstraintExpr {
        &self.expr
    }

    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    pub fn epsilon(&self) -> Option<f64> {
        self.epsilon
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }
}

// =============================================================================
// CANON TEST REQUEST
// =============================================================================

/// A request to verify a named canonical test against a target id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonTestRequest {
    name: String,
    target: String,
    #[serde(default)]
    params: ParamMap,
}

impl CanonTestRequest {
    #[must_use]
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            params: ParamMap::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn params(&self) -> &ParamMap {
        &self.params
    }
}

// =============================================================================
// TESTS
// =============================================================================
