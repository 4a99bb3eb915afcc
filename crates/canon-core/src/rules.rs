//! # Canon Rules
//!
//! The nine canon checks. Each rule is a pure function
//! `&Declaration -> Vec<Finding>`:
//! - No rule reads another rule's output
//! - No rule depends on execution order
//! - No rule performs I/O or keeps state
//!
//! This independence is what makes per-signature verdict caching sound and
//! lets hosts disable individual rules without perturbing the others.
//!
//! | # | Rule | Severity |
//! |---|------|----------|
//! | I | Declaration Integrity | FATAL |
//! | II | Orientation Declaration | ERROR |
//! | III | Motion as Parameter | ERROR |
//! | IV | No Implicit Reflection | ERROR |
//! | V | Epsilon Declaration | ERROR |
//! | VI | Truncation Declaration | ERROR |
//! | VII | Symmetry Declaration | ERROR / WARNING |
//! | VIII | Curvature Class | ERROR |
//! | IX | Void Type | ERROR |

use crate::primitives::{
    CHIRAL_KINDS, MAX_ITERATION_DEPTH, OPPOSITE_ORIENTATIONS, REFLECTION_OF_PARAM,
    REFLECTION_RELATION_KINDS, SYMMETRY_ADVISED_KINDS, SYMMETRY_REQUIRED_KINDS,
    VARIABLE_CURVATURE_KINDS, kind_in,
};
use crate::signature::{canonical_number, params_equivalent};
use crate::types::{ClosureStatus, Declaration, Form, Trace};
use crate::verdict::{Finding, Severity};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// RULE TABLE
// =============================================================================

/// A canon rule: identity, citation and check function.
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    /// Stable identifier, used in findings and configuration.
    pub id: &'static str,
    /// Default citation, e.g. `"Art. I"`.
    pub article: &'static str,
    pub title: &'static str,
    pub check: fn(&Declaration) -> Vec<Finding>,
}

impl RuleSpec {
    /// Run the rule.
    #[must_use]
    pub fn run(&self, decl: &Declaration) -> Vec<Finding> {
        (self.check)(decl)
    }
}

pub const DECLARATION_INTEGRITY: &str = "declaration_integrity";
pub const ORIENTATION_DECLARATION: &str = "orientation_declaration";
pub const MOTION_AS_PARAMETER: &str = "motion_as_parameter";
pub const NO_IMPLICIT_REFLECTION: &str = "no_implicit_reflection";
pub const EPSILON_DECLARATION: &str = "epsilon_declaration";
pub const TRUNCATION_DECLARATION: &str = "truncation_declaration";
pub const SYMMETRY_DECLARATION: &str = "symmetry_declaration";
pub const CURVATURE_CLASS: &str = "curvature_class";
pub const VOID_TYPE: &str = "void_type";

/// The canon, in execution order.
pub const CANON_RULES: [RuleSpec; 9] = [
    RuleSpec {
        id: DECLARATION_INTEGRITY,
        article: "Art. I",
        title: "Declaration Integrity",
        check: declaration_integrity,
    },
    RuleSpec {
        id: ORIENTATION_DECLARATION,
        article: "Art. II",
        title: "Orientation Declaration",
        check: orientation_declaration,
    },
    RuleSpec {
        id: MOTION_AS_PARAMETER,
        article: "Art. III",
        title: "Motion as Parameter",
        check: motion_as_parameter,
    },
    RuleSpec {
        id: NO_IMPLICIT_REFLECTION,
        article: "Art. IV",
        title: "No Implicit Reflection",
        check: no_implicit_reflection,
    },
    RuleSpec {
        id: EPSILON_DECLARATION,
        article: "Art. V",
        title: "Epsilon Declaration",
        check: epsilon_declaration,
    },
    RuleSpec {
        id: TRUNCATION_DECLARATION,
        article: "Art. VI",
        title: "Truncation Declaration",
        check: truncation_declaration,
    },
    RuleSpec {
        id: SYMMETRY_DECLARATION,
        article: "Art. VII",
        title: "Symmetry Declaration",
        check: symmetry_declaration,
    },
    RuleSpec {
        id: CURVATURE_CLASS,
        article: "Art. VIII",
        title: "Curvature Class",
        check: curvature_class,
    },
    RuleSpec {
        id: VOID_TYPE,
        article: "Art. IX",
        title: "Void Type",
        check: void_type,
    },
];

/// Look up a rule by id.
#[must_use]
pub fn rule_by_id(id: &str) -> Option<&'static RuleSpec> {
    CANON_RULES.iter().find(|r| r.id == id)
}

/// Position of a rule in the canon's execution order.
#[must_use]
pub fn rule_index(id: &str) -> Option<usize> {
    CANON_RULES.iter().position(|r| r.id == id)
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

// =============================================================================
// I. DECLARATION INTEGRITY
// =============================================================================

/// Dangling references, duplicate ids and empty ids. FATAL.
pub fn declaration_integrity(decl: &Declaration) -> Vec<Finding> {
    let finding = |message: String| {
        Finding::new(DECLARATION_INTEGRITY, Severity::Fatal, "Art. I", message)
    };
    let mut findings = Vec::new();

    // Empty and duplicate ids across forms ∪ traces
    let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
    for (position, id) in decl
        .forms()
        .iter()
        .map(Form::id)
        .chain(decl.traces().iter().map(Trace::id))
        .enumerate()
    {
        if id.trim().is_empty() {
            findings.push(
                finding(format!("Element at position {} has an empty id", position))
                    .with_fix("give every Form and Trace a non-empty id"),
            );
            continue;
        }
        let count = occurrences.entry(id).or_insert(0);
        *count = count.saturating_add(1);
    }
    for (id, count) in &occurrences {
        if *count > 1 {
            findings.push(
                finding(format!("Id '{}' is declared {} times", id, count))
                    .with_target(*id)
                    .with_fix("rename the duplicates so every id is unique"),
            );
        }
    }

    // Relations link Forms
    for rel in decl.relations() {
        let label = format!("{}({}, {})", rel.kind(), rel.a(), rel.b());
        let mut endpoints = vec![rel.a()];
        if rel.b() != rel.a() {
            endpoints.push(rel.b());
        }
        for endpoint in endpoints {
            if decl.get_form(endpoint).is_none() {
                let message = if decl.get_trace(endpoint).is_some() {
                    format!(
                        "Relation {} names '{}', which is a Trace, not a Form",
                        label, endpoint
                    )
                } else {
                    format!("Relation {} references undeclared id '{}'", label, endpoint)
                };
                findings.push(
                    finding(message)
                        .with_target(label.clone())
                        .with_fix(format!("declare a Form with id '{}'", endpoint)),
                );
            }
        }
    }

    // Traces move Forms
    for trace in decl.traces() {
        if let Some(source) = trace.source_form() {
            if decl.get_form(source).is_none() {
                findings.push(
                    finding(format!(
                        "Trace '{}' is revealed by undeclared Form '{}'",
                        trace.id(),
                        source
                    ))
                    .with_target(trace.id()),
                );
            }
        }
    }

    // Constraints scope over declared elements
    for constraint in decl.constraints() {
        let scoped = constraint.scope().iter().map(String::as_str);
        let referenced = constraint.expr().referenced_ids().into_iter();
        let mut seen = BTreeSet::new();
        for id in scoped.chain(referenced) {
            if !seen.insert(id) {
                continue;
            }
            if !decl.contains_id(id) {
                findings.push(
                    finding(format!(
                        "Constraint '{}' references undeclared id '{}'",
                        constraint.name(),
                        id
                    ))
                    .with_target(constraint.name()),
                );
            }
        }
    }

    // Tests target declared elements
    for test in decl.tests() {
        if !decl.contains_id(test.target()) {
            findings.push(
                finding(format!(
                    "Canon test '{}' targets undeclared id '{}'",
                    test.name(),
                    test.target()
                ))
                .with_target(test.name()),
            );
        }
    }

    findings
}

// =============================================================================
// II. ORIENTATION DECLARATION
// =============================================================================

/// Chirality-sensitive Forms must declare `orientation`. ERROR.
pub fn orientation_declaration(decl: &Declaration) -> Vec<Finding> {
    decl.forms()
        .iter()
        .filter(|f| kind_in(f.kind(), CHIRAL_KINDS) && is_blank(f.orientation()))
        .map(|f| {
            Finding::new(
                ORIENTATION_DECLARATION,
                Severity::Error,
                "Art. II",
                format!(
                    "Form '{}' of chiral kind '{}' has no declared orientation",
                    f.id(),
                    f.kind()
                ),
            )
            .with_target(f.id())
            .with_fix("declare orientation: cw or ccw (left or right)")
        })
        .collect()
}

// =============================================================================
// III. MOTION AS PARAMETER
// =============================================================================

/// Every Trace names its frame. ERROR.
pub fn motion_as_parameter(decl: &Declaration) -> Vec<Finding> {
    decl.traces()
        .iter()
        .filter(|t| is_blank(t.frame()))
        .map(|t| {
            Finding::new(
                MOTION_AS_PARAMETER,
                Severity::Error,
                "Art. III",
                format!("Trace '{}' has no declared frame", t.id()),
            )
            .with_target(t.id())
            .with_fix("declare the frame (temporal or spatial scope) of the motion")
        })
        .collect()
}

// =============================================================================
// IV. NO IMPLICIT REFLECTION
// =============================================================================

fn reflection_declared(decl: &Declaration, x: &str, y: &str) -> bool {
    decl.relations()
        .iter()
        .any(|r| kind_in(r.kind(), REFLECTION_RELATION_KINDS) && r.links(x, y))
}

fn orientations_opposite(a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    OPPOSITE_ORIENTATIONS.iter().any(|(x, y)| {
        (a.eq_ignore_ascii_case(x) && b.eq_ignore_ascii_case(y))
            || (a.eq_ignore_ascii_case(y) && b.eq_ignore_ascii_case(x))
    })
}

fn ordered_pair<'a>(x: &'a str, y: &'a str) -> (&'a str, &'a str) {
    if x <= y { (x, y) } else { (y, x) }
}

/// Reflections that can be inferred must be declared as relations. ERROR.
///
/// A reflection is inferable when a Form names its original through the
/// `reflection_of` parameter, or when two Forms share kind and parameters but
/// carry opposite orientations. Parameters are compared in canonical form, so
/// `turns: 5` and `turns: 5.0` count as shared.
pub fn no_implicit_reflection(decl: &Declaration) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut reported: BTreeSet<(&str, &str)> = BTreeSet::new();

    for form in decl.forms() {
        let Some(original) = form.param(REFLECTION_OF_PARAM).and_then(|v| v.as_str()) else {
            continue;
        };
        if reflection_declared(decl, form.id(), original) {
            continue;
        }
        if reported.insert(ordered_pair(form.id(), original)) {
            findings.push(
                Finding::new(
                    NO_IMPLICIT_REFLECTION,
                    Severity::Error,
                    "Art. IV",
                    format!(
                        "Form '{}' mirrors '{}' but no reflection relation is declared",
                        form.id(),
                        original
                    ),
                )
                .with_target(form.id())
                .with_fix(format!(
                    "declare a 'reflect' relation between '{}' and '{}'",
                    original,
                    form.id()
                )),
            );
        }
    }

    let forms = decl.forms();
    for (i, a) in forms.iter().enumerate() {
        let Some(orient_a) = a.orientation() else {
            continue;
        };
        for b in forms.iter().skip(i.saturating_add(1)) {
            let Some(orient_b) = b.orientation() else {
                continue;
            };
            if !a.kind().eq_ignore_ascii_case(b.kind())
                || !params_equivalent(a.params(), b.params())
                || !orientations_opposite(orient_a, orient_b)
                || reflection_declared(decl, a.id(), b.id())
            {
                continue;
            }
            if reported.insert(ordered_pair(a.id(), b.id())) {
                findings.push(
                    Finding::new(
                        NO_IMPLICIT_REFLECTION,
                        Severity::Error,
                        "Art. IV",
                        format!(
                            "Forms '{}' and '{}' are mirror images ({} / {}) without a declared reflection",
                            a.id(),
                            b.id(),
                            orient_a,
                            orient_b
                        ),
                    )
                    .with_target(a.id())
                    .with_fix(format!(
                        "declare a 'reflect' relation between '{}' and '{}'",
                        a.id(),
                        b.id()
                    )),
                );
            }
        }
    }

    findings
}

// =============================================================================
// V. EPSILON DECLARATION
// =============================================================================

/// Numeric constraints need a positive, finite effective epsilon. ERROR.
pub fn epsilon_declaration(decl: &Declaration) -> Vec<Finding> {
    let mut findings = Vec::new();
    for constraint in decl.constraints() {
        if !constraint.expr().is_numeric() {
            continue;
        }
        match decl.effective_epsilon(constraint) {
            None => findings.push(
                Finding::new(
                    EPSILON_DECLARATION,
                    Severity::Error,
                    "Art. V",
                    format!(
                        "Numeric constraint '{}' has no declared epsilon",
                        constraint.name()
                    ),
                )
                .with_target(constraint.name())
                .with_fix("declare a local epsilon or a declaration-wide epsilon"),
            ),
            Some(eps) if !eps.is_finite() || eps <= 0.0 => findings.push(
                Finding::new(
                    EPSILON_DECLARATION,
                    Severity::Error,
                    "Art. V",
                    format!(
                        "Constraint '{}' uses epsilon {}, which is not a positive finite tolerance",
                        constraint.name(),
                        canonical_number(eps)
                    ),
                )
                .with_target(constraint.name())
                .with_fix("use an epsilon greater than zero"),
            ),
            Some(_) => {}
        }
    }
    findings
}

// =============================================================================
// VI. TRUNCATION DECLARATION
// =============================================================================

/// Forms iterated beyond [`MAX_ITERATION_DEPTH`] must declare `truncated`. ERROR.
pub fn truncation_declaration(decl: &Declaration) -> Vec<Finding> {
    decl.forms()
        .iter()
        .filter_map(|f| {
            let depth = f.iteration_depth()?;
            (depth > MAX_ITERATION_DEPTH && !f.is_truncated()).then(|| {
                Finding::new(
                    TRUNCATION_DECLARATION,
                    Severity::Error,
                    "Art. VI",
                    format!(
                        "Form '{}' iterates to depth {} (limit {}) without declaring truncation",
                        f.id(),
                        depth,
                        MAX_ITERATION_DEPTH
                    ),
                )
                .with_target(f.id())
                .with_fix("set truncated = true or reduce iteration_depth")
            })
        })
        .collect()
}

// =============================================================================
// VII. SYMMETRY DECLARATION
// =============================================================================

/// Symmetry-bearing kinds declare `symmetry_class`. ERROR or WARNING by kind.
pub fn symmetry_declaration(decl: &Declaration) -> Vec<Finding> {
    decl.forms()
        .iter()
        .filter(|f| is_blank(f.symmetry_class()))
        .filter_map(|f| {
            let severity = if kind_in(f.kind(), SYMMETRY_REQUIRED_KINDS) {
                Severity::Error
            } else if kind_in(f.kind(), SYMMETRY_ADVISED_KINDS) {
                Severity::Warning
            } else {
                return None;
            };
            Some(
                Finding::new(
                    SYMMETRY_DECLARATION,
                    severity,
                    "Art. VII",
                    format!(
                        "Form '{}' of kind '{}' has no declared symmetry class",
                        f.id(),
                        f.kind()
                    ),
                )
                .with_target(f.id())
                .with_fix("declare symmetry_class, e.g. a dihedral or polyhedral group"),
            )
        })
        .collect()
}

// =============================================================================
// VIII. CURVATURE CLASS
// =============================================================================

/// Forms of varying curvature declare `curvature_class`. ERROR.
pub fn curvature_class(decl: &Declaration) -> Vec<Finding> {
    decl.forms()
        .iter()
        .filter(|f| kind_in(f.kind(), VARIABLE_CURVATURE_KINDS) && is_blank(f.curvature_class()))
        .map(|f| {
            Finding::new(
                CURVATURE_CLASS,
                Severity::Error,
                "Art. VIII",
                format!(
                    "Curved Form '{}' of kind '{}' has no declared curvature class",
                    f.id(),
                    f.kind()
                ),
            )
            .with_target(f.id())
            .with_fix("declare curvature_class")
        })
        .collect()
}

// =============================================================================
// IX. VOID TYPE
// =============================================================================

/// Open Traces classify their void. ERROR.
pub fn void_type(decl: &Declaration) -> Vec<Finding> {
    decl.traces()
        .iter()
        .filter(|t| t.closure_status() == ClosureStatus::Open && is_blank(t.void_type()))
        .map(|t| {
            Finding::new(
                VOID_TYPE,
                Severity::Error,
                "Art. IX",
                format!("Open Trace '{}' has no declared void type", t.id()),
            )
            .with_target(t.id())
            .with_fix("declare void_type, or close the trace")
        })
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
