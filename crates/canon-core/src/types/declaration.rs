//! The aggregate root submitted for validation and realization.

use super::{CanonTestRequest, Form, InvariantConstraint, Relation, Trace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// An immutable aggregate of Forms, Relations, Traces, Constraints and Tests.
///
/// Every id referenced by a Relation, Trace, Constraint or Test must resolve
/// to a Form or Trace of the same Declaration. The AST does not enforce this;
/// the `declaration_integrity` rule reports violations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Declaration {
    #[serde(default)]
    title: String,
    #[serde(default)]
    forms: Vec<Form>,
    #[serde(default)]
    relations: Vec<Relation>,
    #[serde(default)]
    traces: Vec<Trace>,
    #[serde(default)]
    constraints: Vec<InvariantConstraint>,
    #[serde(default)]
    tests: Vec<CanonTestRequest>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    epsilon: Option<f64>,
}

impl Declaration {
    /// Create an empty declaration.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_form(mut self, form: Form) -> Self {
        self.forms.push(form);
        self
    }

    #[must_use]
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    #[must_use]
    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.traces.push(trace);
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: InvariantConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    #[must_use]
    pub fn with_test(mut self, test: CanonTestRequest) -> Self {
        self.tests.push(test);
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Declare the global tolerance used by constraints without a local one.
    #[must_use]
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    /// Build a new declaration where every Form sharing `form.id()` is
    /// replaced by `form`. Appends `form` if no Form had that id.
    #[must_use]
    pub fn replacing_form(mut self, form: Form) -> Self {
        let mut replaced = false;
        for existing in &mut self.forms {
            if existing.id() == form.id() {
                *existing = form.clone();
                replaced = true;
            }
        }
        if !replaced {
            self.forms.push(form);
        }
        self
    }

    /// Build a new declaration without the Form `id`.
    ///
    /// Relations naming the removed Form are kept; the integrity rule will
    /// report them as dangling.
    #[must_use]
    pub fn without_form(mut self, id: &str) -> Self {
        self.forms.retain(|f| f.id() != id);
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn forms(&self) -> &[Form] {
        &self.forms
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn constraints(&self) -> &[InvariantConstraint] {
        &self.constraints
    }

    pub fn tests(&self) -> &[CanonTestRequest] {
        &self.tests
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// The global tolerance, if declared.
    pub fn epsilon(&self) -> Option<f64> {
        self.epsilon
    }

    /// First Form with the given id.
    pub fn get_form(&self, id: &str) -> Option<&Form> {
        self.forms.iter().find(|f| f.id() == id)
    }

    /// First Trace with the given id.
    pub fn get_trace(&self, id: &str) -> Option<&Trace> {
        self.traces.iter().find(|t| t.id() == id)
    }

    /// The id space of the declaration: Form ids ∪ Trace ids, sorted.
    ///
    /// Duplicates collapse here; use the integrity rule to detect them.
    pub fn get_all_ids(&self) -> BTreeSet<&str> {
        self.forms
            .iter()
            .map(Form::id)
            .chain(self.traces.iter().map(Trace::id))
            .collect()
    }

    /// True if `id` names a Form or Trace.
    pub fn contains_id(&self, id: &str) -> bool {
        self.get_form(id).is_some() || self.get_trace(id).is_some()
    }

    /// Tolerance in effect for a constraint: its local epsilon, else the
    /// declaration's global one.
    pub fn effective_epsilon(&self, constraint: &InvariantConstraint) -> Option<f64> {
        constraint.epsilon().or(self.epsilon)
    }

    /// True if the declaration holds no forms, traces or constraints.
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty() && self.traces.is_empty() && self.constraints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConstraintExpr;

    fn sample() -> Declaration {
        Declaration::new("sample")
            .with_form(Form::new("f1", "circle").with_param("radius", 5))
            .with_form(Form::new("f2", "square").with_param("side", 2))
            .with_trace(Trace::new("t1", "sweep").with_source_form("f1"))
    }

    #[test]
    fn lookup_by_id() {
        let decl = sample();
        assert_eq!(decl.get_form("f2").map(Form::kind), Some("square"));
        assert!(decl.get_form("t1").is_none());
        assert!(decl.get_trace("t1").is_some());
        assert!(decl.contains_id("t1"));
        assert!(!decl.contains_id("missing"));
    }

    #[test]
    fn all_ids_spans_forms_and_traces() {
        let decl = sample();
        let ids: Vec<_> = decl.get_all_ids().into_iter().collect();
        assert_eq!(ids, vec!["f1", "f2", "t1"]);
    }

    #[test]
    fn replacing_form_leaves_original_untouched() {
        let original = sample();
        let edited = original
            .clone()
            .replacing_form(Form::new("f1", "circle").with_param("radius", 7));

        assert_eq!(
            original.get_form("f1").and_then(|f| f.param("radius")),
            Some(&crate::ParamValue::Int(5))
        );
        assert_eq!(
            edited.get_form("f1").and_then(|f| f.param("radius")),
            Some(&crate::ParamValue::Int(7))
        );
        assert_eq!(edited.forms().len(), 2);
    }

    #[test]
    fn without_form_removes_only_that_form() {
        let decl = sample().without_form("f2");
        assert_eq!(decl.forms().len(), 1);
        assert!(decl.get_form("f1").is_some());
    }

    #[test]
    fn local_epsilon_overrides_global() {
        let decl = Declaration::new("eps").with_epsilon(0.01);
        let local = InvariantConstraint::new("c1", ConstraintExpr::literal(1)).with_epsilon(0.5);
        let global = InvariantConstraint::new("c2", ConstraintExpr::literal(1));

        assert_eq!(decl.effective_epsilon(&local), Some(0.5));
        assert_eq!(decl.effective_epsilon(&global), Some(0.01));
        assert_eq!(Declaration::new("none").effective_epsilon(&global), None);
    }

    #[test]
    fn deserializes_from_json() {
        let json = r#"{
            "title": "scenario",
            "forms": [{"id": "f1", "kind": "circle", "params": {"radius": 5}}],
            "epsilon": 0.001
        }"#;
        let decl: Declaration = serde_json::from_str(json).expect("parse");
        assert_eq!(decl.forms().len(), 1);
        assert_eq!(decl.epsilon(), Some(0.001));
        assert!(decl.relations().is_empty());
    }
}
