//! # Canon Scenario Tests (C0-C4)
//!
//! End-to-end behavior of the engine: validate, gate, realize.
//!
//! ## Tiers
//! - C0: Clean declarations realize
//! - C1: Structural violations fail fast
//! - C2: Strictness modes and bypass
//! - C3: Signatures and the verdict cache
//! - C4: Registries and partial failure
//! - C5: Shared engines across threads

use canon_core::{
    Artifact, CanonEngine, CanonError, ClosureStatus, ConstraintExpr, Declaration, EngineConfig,
    Form, FormRealization, InvariantConstraint, ParamValue, RealizationError, RealizeContext,
    RealizeFailure, Realizer, Relation, Severity, Signature, Trace, Verdict,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// FIXTURES
// =============================================================================

/// Realizer that records how often it ran and echoes a Form's radius.
struct RecordingRealizer {
    name: &'static str,
    calls: AtomicUsize,
}

impl RecordingRealizer {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Realizer for RecordingRealizer {
    fn name(&self) -> &str {
        self.name
    }

    fn realize_form(
        &self,
        form: &Form,
        _context: &RealizeContext,
    ) -> Result<FormRealization, RealizationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let radius = form
            .param("radius")
            .and_then(|v| v.as_f64())
            .unwrap_or_default();
        if radius < 0.0 {
            return Err(RealizationError::new(form.id(), "negative radius"));
        }
        Ok(FormRealization::new(
            form,
            Artifact::new()
                .with_vertex(vec![0.0, 0.0])
                .with_measure("radius", radius),
            self.name,
        ))
    }
}

fn circle(id: &str, radius: i64) -> Form {
    Form::new(id, "circle").with_param("radius", radius)
}

fn engine_with(config: EngineConfig, kinds: &[&str]) -> (CanonEngine, Arc<RecordingRealizer>) {
    let mut engine = CanonEngine::with_config(config).expect("config");
    let realizer = RecordingRealizer::new("recording");
    for kind in kinds {
        engine
            .register_realizer(kind, realizer.clone())
            .expect("register");
    }
    (engine, realizer)
}

fn open_trace_declaration() -> Declaration {
    Declaration::new("open sweep")
        .with_form(circle("f1", 5))
        .with_trace(
            Trace::new("t1", "sweep")
                .with_source_form("f1")
                .with_frame("t in [0, 1]")
                .with_closure_status(ClosureStatus::Open),
        )
        .with_epsilon(0.001)
}

// =============================================================================
// TIER C0: CLEAN DECLARATIONS REALIZE
// =============================================================================

mod c0_clean_declarations {
    use super::*;

    /// C0.1: A lone circle with an epsilon has no blocking findings.
    #[test]
    fn single_circle_passes_and_realizes() {
        let (engine, realizer) = engine_with(EngineConfig::default(), &["circle"]);
        let decl = Declaration::new("one circle")
            .with_form(circle("f1", 5))
            .with_epsilon(0.001);

        let verdict = engine.validate(&decl).expect("validate");
        assert!(verdict.passed());
        assert_eq!(verdict.counts().fatal, 0);
        assert_eq!(verdict.counts().error, 0);

        let result = engine
            .realize(&decl, false, &RealizeContext::new())
            .expect("realize");
        assert!(result.is_complete());
        assert_eq!(result.realizations.len(), 1);
        assert_eq!(result.realizations[0].form_id, "f1");
        assert_eq!(result.realizations[0].provenance.realizer, "recording");
        assert_eq!(result.signature, *verdict.signature());
        assert!(result.bypass.is_none());
        assert_eq!(realizer.calls(), 1);
    }

    /// C0.2: An empty declaration is valid and realizes nothing.
    #[test]
    fn empty_declaration_is_valid() {
        let (engine, realizer) = engine_with(EngineConfig::default(), &["circle"]);
        let decl = Declaration::new("empty");

        assert!(engine.validate(&decl).expect("validate").findings().is_empty());
        let result = engine
            .realize(&decl, false, &RealizeContext::new())
            .expect("realize");
        assert!(result.realizations.is_empty());
        assert_eq!(realizer.calls(), 0);
    }

    /// C0.3: The summary names the declaration and the outcome.
    #[test]
    fn summary_of_clean_declaration() {
        let engine = CanonEngine::new();
        let decl = Declaration::new("one circle").with_form(circle("f1", 5));

        let summary = engine.validate_and_summarize(&decl).expect("summary");
        assert!(summary.contains("\"one circle\": PASSED"));
        assert!(summary.contains("0 fatal, 0 error"));
    }
}

// =============================================================================
// TIER C1: STRUCTURAL VIOLATIONS FAIL FAST
// =============================================================================

mod c1_fail_fast {
    use super::*;

    /// C1.1: A relation to a missing Form is one FATAL integrity finding.
    #[test]
    fn dangling_relation_is_fatal() {
        let engine = CanonEngine::new();
        let decl = Declaration::new("dangling")
            .with_form(circle("f1", 5))
            .with_relation(Relation::new("contains", "f1", "f2"));

        let verdict = engine.validate(&decl).expect("validate");
        assert!(!verdict.passed());
        assert_eq!(verdict.counts().fatal, 1);
        assert_eq!(verdict.findings().len(), 1);

        let finding = &verdict.findings()[0];
        assert_eq!(finding.rule_id, "declaration_integrity");
        assert_eq!(finding.severity, Severity::Fatal);
        assert_eq!(finding.canon_article, "Art. I");
    }

    /// C1.2: A failing verdict blocks realization before any realizer runs.
    #[test]
    fn failing_verdict_invokes_zero_realizers() {
        let (engine, realizer) = engine_with(EngineConfig::default(), &["circle"]);
        let decl = Declaration::new("dangling")
            .with_form(circle("f1", 5))
            .with_relation(Relation::new("contains", "f1", "f2"));

        let err = engine
            .realize(&decl, false, &RealizeContext::new())
            .expect_err("must block");
        assert!(matches!(err, CanonError::Validation(_)));
        let verdict = err.verdict().expect("verdict attached");
        assert_eq!(verdict.counts().fatal, 1);
        assert_eq!(realizer.calls(), 0);
    }

    /// C1.3: FATAL blocks even in lenient mode.
    #[test]
    fn fatal_blocks_in_lenient_mode() {
        let (engine, realizer) = engine_with(
            EngineConfig {
                strict: false,
                ..EngineConfig::default()
            },
            &["circle"],
        );
        let decl = Declaration::new("duplicate ids")
            .with_form(circle("f1", 5))
            .with_form(circle("f1", 6));

        let result = engine.realize(&decl, false, &RealizeContext::new());
        assert!(matches!(result, Err(CanonError::Validation(_))));
        assert_eq!(realizer.calls(), 0);
    }
}

// =============================================================================
// TIER C2: STRICTNESS MODES AND BYPASS
// =============================================================================

mod c2_modes_and_bypass {
    use super::*;

    /// C2.1: An open trace without void type is one ERROR finding.
    #[test]
    fn open_trace_without_void_type() {
        let engine = CanonEngine::new();
        let verdict = engine.validate(&open_trace_declaration()).expect("validate");

        assert_eq!(verdict.counts().error, 1);
        assert_eq!(verdict.counts().fatal, 0);
        let finding = &verdict.findings()[0];
        assert_eq!(finding.rule_id, "void_type");
        assert_eq!(finding.canon_article, "Art. IX");
        assert_eq!(finding.target_id.as_deref(), Some("t1"));
    }

    /// C2.2: Strict mode blocks on ERROR.
    #[test]
    fn strict_mode_blocks_on_error() {
        let (engine, realizer) = engine_with(EngineConfig::default(), &["circle"]);
        let result = engine.realize(&open_trace_declaration(), false, &RealizeContext::new());

        assert!(matches!(result, Err(CanonError::Validation(_))));
        assert_eq!(realizer.calls(), 0);
    }

    /// C2.3: Lenient mode lets ERROR through.
    #[test]
    fn lenient_mode_proceeds_on_error() {
        let (engine, realizer) = engine_with(
            EngineConfig {
                strict: false,
                ..EngineConfig::default()
            },
            &["circle"],
        );
        let decl = open_trace_declaration();

        let verdict = engine.validate(&decl).expect("validate");
        assert!(verdict.passed());
        assert_eq!(verdict.counts().error, 1);

        let result = engine
            .realize(&decl, false, &RealizeContext::new())
            .expect("realize");
        assert_eq!(result.realizations.len(), 1);
        assert_eq!(realizer.calls(), 1);
    }

    /// C2.4: Bypass while disabled is a misuse error, not a verdict.
    #[test]
    fn bypass_rejected_when_disabled() {
        let (engine, realizer) = engine_with(EngineConfig::default(), &["circle"]);
        let decl = Declaration::new("clean").with_form(circle("f1", 5));

        let result = engine.realize(&decl, true, &RealizeContext::new());
        assert!(matches!(result, Err(CanonError::Bypass(_))));
        assert_eq!(realizer.calls(), 0);
    }

    /// C2.5: An allowed bypass realizes and carries an audit warning.
    #[test]
    fn allowed_bypass_is_audited() {
        let (engine, realizer) = engine_with(
            EngineConfig {
                allow_bypass: true,
                ..EngineConfig::default()
            },
            &["circle"],
        );
        let decl = open_trace_declaration();

        let result = engine
            .realize(&decl, true, &RealizeContext::new())
            .expect("bypass");
        let warning = result.bypass.as_ref().expect("warning recorded");
        assert!(!warning.verdict_passed);
        assert_eq!(warning.counts.error, 1);
        assert_eq!(warning.signature, result.signature);
        assert_eq!(realizer.calls(), 1);
    }
}

// =============================================================================
// TIER C3: SIGNATURES AND THE VERDICT CACHE
// =============================================================================

mod c3_cache {
    use super::*;

    /// C3.1: Construction order does not change the signature or cache entry.
    #[test]
    fn construction_order_shares_cache_entry() {
        let engine = CanonEngine::new();
        let first = Declaration::new("pair")
            .with_form(circle("a", 1))
            .with_form(circle("b", 2))
            .with_relation(Relation::new("contains", "a", "b"))
            .with_relation(Relation::new("tangent", "b", "a"));
        let second = Declaration::new("pair")
            .with_relation(Relation::new("tangent", "b", "a"))
            .with_form(circle("b", 2))
            .with_relation(Relation::new("contains", "a", "b"))
            .with_form(circle("a", 1));

        assert_eq!(
            engine.signature(&first).expect("sig"),
            engine.signature(&second).expect("sig")
        );

        let verdict = engine.validate(&first).expect("validate");
        let (cached, timestamp) = engine
            .get_cached_verdict(&second)
            .expect("cache lookup")
            .expect("cache hit");
        assert_eq!(cached, verdict);
        assert_eq!(timestamp, verdict.timestamp());
        assert_eq!(engine.cache_len(), 1);
    }

    /// C3.2: Validating twice returns the identical verdict.
    #[test]
    fn validate_is_idempotent() {
        let engine = CanonEngine::new();
        let decl = open_trace_declaration();

        let first = engine.validate(&decl).expect("validate");
        let second = engine.validate(&decl).expect("validate");
        assert_eq!(first, second);
    }

    /// C3.3: Nothing is cached before the first validation.
    #[test]
    fn cache_starts_empty() {
        let engine = CanonEngine::new();
        let cached = engine
            .get_cached_verdict(&open_trace_declaration())
            .expect("cache lookup");
        assert!(cached.is_none());
    }

    /// C3.4: A new canon version ignores verdicts cached under the old one.
    #[test]
    fn canon_version_change_invalidates() {
        let mut engine = CanonEngine::new();
        let decl = open_trace_declaration();
        let old = engine.validate(&decl).expect("validate");
        assert_eq!(old.canon_version(), "1.0");

        engine.set_canon_version("2.0");
        assert!(engine.get_cached_verdict(&decl).expect("cache lookup").is_none());

        let new = engine.validate(&decl).expect("validate");
        assert_eq!(new.canon_version(), "2.0");
        assert_eq!(new.signature(), old.signature());
    }

    /// C3.5: An edited declaration is a different cache entry.
    #[test]
    fn edit_produces_new_signature() {
        let engine = CanonEngine::new();
        let decl = open_trace_declaration();
        let verdict = engine.validate(&decl).expect("validate");

        let edited = decl.replacing_form(circle("f1", 6));
        assert!(engine.get_cached_verdict(&edited).expect("cache lookup").is_none());
        let edited_verdict = engine.validate(&edited).expect("validate");
        assert_ne!(edited_verdict.signature(), verdict.signature());
        assert_eq!(engine.cache_len(), 2);
    }

    /// C3.6: Engines do not share caches.
    #[test]
    fn engines_are_independent() {
        let a = CanonEngine::new();
        let b = CanonEngine::new();
        let decl = open_trace_declaration();

        a.validate(&decl).expect("validate");
        assert!(b.get_cached_verdict(&decl).expect("cache lookup").is_none());
    }

    fn spiral_twins(turns_b: ParamValue) -> Declaration {
        let spiral = |id: &str, turns: ParamValue, orientation: &str| {
            Form::new(id, "spiral")
                .with_param("turns", turns)
                .with_orientation(orientation)
                .with_curvature_class("logarithmic")
        };
        Declaration::new("twins")
            .with_form(spiral("a", ParamValue::Int(5), "cw"))
            .with_form(spiral("b", turns_b, "ccw"))
    }

    /// C3.7: `5` and `5.0` share a signature, and both are mirror twins.
    #[test]
    fn int_and_float_twins_share_signature_and_verdict() {
        let (engine, realizer) = engine_with(EngineConfig::default(), &["spiral"]);
        let int_pair = spiral_twins(ParamValue::Int(5));
        let mixed_pair = spiral_twins(ParamValue::Float(5.0));
        assert_eq!(
            engine.signature(&int_pair).expect("sig"),
            engine.signature(&mixed_pair).expect("sig")
        );

        let cached = engine.validate(&int_pair).expect("validate");
        let uncached = CanonEngine::new().validate(&mixed_pair).expect("validate");
        assert!(!cached.passed());
        assert_eq!(cached.findings(), uncached.findings());
        assert_eq!(cached.findings_for_rule("no_implicit_reflection").count(), 1);

        let result = engine.realize(&mixed_pair, false, &RealizeContext::new());
        assert!(matches!(result, Err(CanonError::Validation(_))));
        assert_eq!(realizer.calls(), 0);
        assert_eq!(engine.cache_len(), 1);
    }

    fn epsilon_constrained(epsilon: f64) -> Declaration {
        Declaration::new("eps")
            .with_form(circle("f1", 5))
            .with_constraint(InvariantConstraint::new(
                "radius",
                ConstraintExpr::op(
                    "eq",
                    vec![
                        ConstraintExpr::reference("f1", "radius"),
                        ConstraintExpr::literal(5),
                    ],
                ),
            ))
            .with_epsilon(epsilon)
    }

    /// C3.8: Tiny epsilons of opposite sign never share a cached verdict.
    #[test]
    fn tiny_epsilons_are_distinct_cache_entries() {
        let (engine, realizer) = engine_with(EngineConfig::default(), &["circle"]);
        let positive = epsilon_constrained(1e-13);
        let negative = epsilon_constrained(-1e-13);

        let passing = engine.validate(&positive).expect("validate");
        assert!(passing.passed());
        assert!(engine.get_cached_verdict(&negative).expect("cache lookup").is_none());

        let failing = engine.validate(&negative).expect("validate");
        assert_ne!(failing.signature(), passing.signature());
        assert!(!failing.passed());
        assert_eq!(failing.findings_for_rule("epsilon_declaration").count(), 1);
        assert!(matches!(
            engine.realize(&negative, false, &RealizeContext::new()),
            Err(CanonError::Validation(_))
        ));
        assert_eq!(realizer.calls(), 0);
        assert_eq!(engine.cache_len(), 2);
    }
}

// =============================================================================
// TIER C4: REGISTRIES AND PARTIAL FAILURE
// =============================================================================

mod c4_registries {
    use super::*;

    /// C4.1: Re-registering a kind is rejected; the first realizer stays.
    #[test]
    fn duplicate_registration_rejected() {
        let mut engine = CanonEngine::new();
        let a = RecordingRealizer::new("a");
        let b = RecordingRealizer::new("b");
        engine.register_realizer("cube", a.clone()).expect("first");

        let err = engine
            .register_realizer("cube", b.clone())
            .expect_err("duplicate");
        assert!(matches!(err, CanonError::DuplicateRealizer(ref kind) if kind == "cube"));

        let decl = Declaration::new("cube").with_form(
            Form::new("c1", "cube")
                .with_param("edge", 1)
                .with_symmetry_class("Oh"),
        );
        let result = engine
            .realize(&decl, false, &RealizeContext::new())
            .expect("realize");
        assert_eq!(result.realizations[0].provenance.realizer, "a");
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
    }

    /// C4.2: Missing realizers are collected per Form.
    #[test]
    fn missing_realizers_are_partial_failures() {
        let (engine, _) = engine_with(EngineConfig::default(), &["circle"]);
        let decl = Declaration::new("mixed")
            .with_form(circle("c1", 1))
            .with_form(Form::new("p1", "point"))
            .with_form(circle("c2", 2))
            .with_form(Form::new("s1", "segment"));

        let result = engine
            .realize(&decl, false, &RealizeContext::new())
            .expect("realize");
        assert!(!result.is_complete());
        assert_eq!(result.realizations.len(), 2);
        assert_eq!(result.missing_realizers().count(), 2);

        let missing: Vec<&str> = result.failures.iter().map(RealizeFailure::form_id).collect();
        assert_eq!(missing, vec!["p1", "s1"]);
        assert!(result.get("c2").is_some());
    }

    /// C4.3: A realizer failure does not abort sibling Forms.
    #[test]
    fn realization_errors_are_partial_failures() {
        let (engine, realizer) = engine_with(EngineConfig::default(), &["circle"]);
        let decl = Declaration::new("bad radius")
            .with_form(circle("c1", -1))
            .with_form(circle("c2", 2));

        let result = engine
            .realize(&decl, false, &RealizeContext::new())
            .expect("realize");
        assert_eq!(realizer.calls(), 2);
        assert_eq!(result.realizations.len(), 1);
        let errors: Vec<_> = result.realization_errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].form_id, "c1");
    }
}

// =============================================================================
// TIER C5: SHARED ENGINES ACROSS THREADS
// =============================================================================

mod c5_concurrency {
    use super::*;
    use std::thread;

    fn declarations() -> Vec<Declaration> {
        vec![
            open_trace_declaration(),
            Declaration::new("one circle")
                .with_form(circle("f1", 5))
                .with_epsilon(0.001),
            // same content as the previous one, built in another order
            Declaration::new("one circle")
                .with_epsilon(0.001)
                .with_form(circle("f1", 5)),
            Declaration::new("dangling")
                .with_form(circle("f1", 1))
                .with_relation(Relation::new("contains", "f1", "f2")),
            Declaration::new("pair")
                .with_form(circle("a", 1))
                .with_form(circle("b", 2)),
        ]
    }

    /// C5.1: Racing validations agree on one verdict per signature.
    #[test]
    fn concurrent_validation_yields_one_verdict_per_signature() {
        let engine = CanonEngine::new();
        let decls = declarations();

        let observed: Vec<(Signature, Verdict)> = thread::scope(|s| {
            let workers: Vec<_> = (0..8usize)
                .map(|worker| {
                    let engine = &engine;
                    let decls = &decls;
                    s.spawn(move || {
                        let mut seen = Vec::new();
                        for round in 0..4usize {
                            for i in 0..decls.len() {
                                let decl = &decls[(i + worker + round) % decls.len()];
                                let verdict = engine.validate(decl).expect("validate");
                                seen.push((verdict.signature().clone(), verdict));
                            }
                        }
                        seen
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|w| w.join().expect("worker"))
                .collect()
        });

        let mut by_signature: BTreeMap<Signature, Verdict> = BTreeMap::new();
        for (signature, verdict) in observed {
            let first = by_signature.entry(signature).or_insert_with(|| verdict.clone());
            assert_eq!(first.timestamp(), verdict.timestamp());
            assert_eq!(*first, verdict);
        }

        let distinct: BTreeSet<Signature> = decls
            .iter()
            .map(|d| engine.signature(d).expect("sig"))
            .collect();
        assert_eq!(distinct.len(), 4);
        assert_eq!(by_signature.len(), distinct.len());
        assert_eq!(engine.cache_len(), distinct.len());

        for decl in &decls {
            let (cached, timestamp) = engine
                .get_cached_verdict(decl)
                .expect("cache lookup")
                .expect("cache hit");
            assert_eq!(timestamp, by_signature[cached.signature()].timestamp());
        }
    }

    /// C5.2: Racing realizations of a failing declaration never dispatch.
    #[test]
    fn concurrent_realize_respects_the_gate() {
        let (engine, realizer) = engine_with(EngineConfig::default(), &["circle"]);
        let decls = declarations();
        let dangling = &decls[3];

        thread::scope(|s| {
            for _ in 0..6 {
                s.spawn(|| {
                    let result = engine.realize(dangling, false, &RealizeContext::new());
                    assert!(matches!(result, Err(CanonError::Validation(_))));
                });
            }
        });
        assert_eq!(realizer.calls(), 0);
        assert_eq!(engine.cache_len(), 1);
    }

    /// Realizer that panics on every call.
    struct PanickingRealizer;

    impl Realizer for PanickingRealizer {
        fn name(&self) -> &str {
            "panicking"
        }

        #[allow(clippy::panic)]
        fn realize_form(
            &self,
            form: &Form,
            _context: &RealizeContext,
        ) -> Result<FormRealization, RealizationError> {
            panic!("realizer crashed on {}", form.id());
        }
    }

    /// C5.3: A thread that dies mid-realization leaves the engine usable.
    #[test]
    fn engine_survives_a_crashed_worker() {
        let mut engine = CanonEngine::new();
        engine
            .register_realizer("circle", Arc::new(PanickingRealizer))
            .expect("register");
        let decls = declarations();
        let clean = &decls[1];

        let before = engine.validate(clean).expect("validate");
        thread::scope(|s| {
            let crashed = s
                .spawn(|| engine.realize(clean, false, &RealizeContext::new()))
                .join();
            assert!(crashed.is_err());
        });

        let after = engine.validate(clean).expect("validate after crash");
        assert_eq!(after.timestamp(), before.timestamp());
        assert_eq!(engine.cache_len(), 1);
        engine.validate(&decls[0]).expect("validate");
        assert_eq!(engine.cache_len(), 2);
    }
}
