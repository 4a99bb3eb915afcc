//! # Canon Engine
//!
//! Orchestrates validation and realization:
//! - Runs the enabled canon rules and aggregates their findings into a `Verdict`
//! - Caches verdicts by declaration signature, per `canon_version`
//! - Gates `realize()` on the verdict, with an audited bypass path
//! - Dispatches Forms to registered realizers, tolerating per-form failures
//!
//! ## State
//!
//! An engine is an explicit value, never a global. Two pieces of state are
//! mutable:
//! - The verdict cache sits behind a `Mutex`; entries are replaced wholesale.
//! - The realizer and solver registries can only be changed through
//!   `&mut self`, so they are frozen for as long as the engine is shared.
//!
//! ## Registry Keys
//!
//! Kinds are matched after trimming and ASCII-lowercasing, so `"Cube"` and
//! `"cube"` resolve to the same realizer.

use crate::articles::ArticleTable;
use crate::config::EngineConfig;
use crate::error::{
    CanonBypassError, CanonBypassWarning, CanonError, CanonValidationError, MissingRealizerError,
    RealizationError,
};
use crate::plugin::{FormRealization, RealizeContext, Realizer, SolveResult, Solver};
use crate::report::render_summary;
use crate::rules::{CANON_RULES, RuleSpec};
use crate::signature::{Signature, compute_signature};
use crate::types::Declaration;
use crate::verdict::{Finding, StrictnessMode, Verdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// =============================================================================
// REALIZE RESULT
// =============================================================================

/// Why one Form was not realized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RealizeFailure {
    /// No realizer for the Form's kind.
    MissingRealizer(MissingRealizerError),
    /// The realizer rejected the Form.
    Realization(RealizationError),
}

impl RealizeFailure {
    pub fn form_id(&self) -> &str {
        match self {
            Self::MissingRealizer(e) => &e.form_id,
            Self::Realization(e) => &e.form_id,
        }
    }
}

impl std::fmt::Display for RealizeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRealizer(e) => write!(f, "{}", e),
            Self::Realization(e) => write!(f, "{}", e),
        }
    }
}

/// Per-form outcomes of a realization run, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizeResult {
    pub signature: Signature,
    pub canon_version: String,
    pub timestamp: DateTime<Utc>,
    /// Successful realizations, in declaration order.
    pub realizations: Vec<FormRealization>,
    /// Failed Forms, in declaration order.
    pub failures: Vec<RealizeFailure>,
    /// Present when the run went through an audited bypass.
    pub bypass: Option<CanonBypassWarning>,
}

impl RealizeResult {
    /// True if every Form was realized.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Realization of one Form.
    pub fn get(&self, form_id: &str) -> Option<&FormRealization> {
        self.realizations.iter().find(|r| r.form_id == form_id)
    }

    pub fn missing_realizers(&self) -> impl Iterator<Item = &MissingRealizerError> {
        self.failures.iter().filter_map(|f| match f {
            RealizeFailure::MissingRealizer(e) => Some(e),
            RealizeFailure::Realization(_) => None,
        })
    }

    pub fn realization_errors(&self) -> impl Iterator<Item = &RealizationError> {
        self.failures.iter().filter_map(|f| match f {
            RealizeFailure::Realization(e) => Some(e),
            RealizeFailure::MissingRealizer(_) => None,
        })
    }
}

// =============================================================================
// VERDICT CACHE
// =============================================================================

/// Signature → verdict. The verdict carries its own canon version and
/// timestamp; entries under another version are stale. `order` indexes
/// entries by insertion sequence number, oldest first, for eviction.
#[derive(Debug)]
struct VerdictCache {
    entries: BTreeMap<Signature, (u64, Verdict)>,
    order: BTreeMap<u64, Signature>,
    capacity: usize,
    next_seq: u64,
}

impl VerdictCache {
    fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            order: BTreeMap::new(),
            capacity,
            next_seq: 0,
        }
    }

    fn fresh(&self, signature: &Signature, canon_version: &str) -> Option<&Verdict> {
        self.entries
            .get(signature)
            .map(|(_, v)| v)
            .filter(|v| v.canon_version() == canon_version)
    }

    fn insert(&mut self, verdict: Verdict) {
        if self.capacity == 0 {
            return;
        }
        let signature = verdict.signature().clone();
        if let Some((old_seq, _)) = self.entries.remove(&signature) {
            self.order.remove(&old_seq);
        }
        while self.entries.len() >= self.capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.order.insert(seq, signature.clone());
        self.entries.insert(signature, (seq, verdict));
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

fn registry_key(kind: &str) -> String {
    kind.trim().to_ascii_lowercase()
}

// =============================================================================
// ENGINE
// =============================================================================

/// The canon validation and realization engine.
pub struct CanonEngine {
    rules: Vec<RuleSpec>,
    canon_version: String,
    mode: StrictnessMode,
    allow_bypass: bool,
    articles: ArticleTable,
    realizers: BTreeMap<String, Arc<dyn Realizer>>,
    solvers: BTreeMap<String, Arc<dyn Solver>>,
    cache: Mutex<VerdictCache>,
}

impl std::fmt::Debug for CanonEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonEngine")
            .field("rules", &self.rules.iter().map(|r| r.id).collect::<Vec<_>>())
            .field("canon_version", &self.canon_version)
            .field("mode", &self.mode)
            .field("allow_bypass", &self.allow_bypass)
            .field("realizers", &self.realizers.keys().collect::<Vec<_>>())
            .field("solvers", &self.solvers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for CanonEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CanonEngine {
    /// Engine with the default configuration: strict, no bypass, every rule.
    #[must_use]
    pub fn new() -> Self {
        Self::build(EngineConfig::default())
    }

    /// Engine from a configuration, validated first.
    pub fn with_config(config: EngineConfig) -> Result<Self, CanonError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        let rules = CANON_RULES
            .iter()
            .filter(|r| !config.disabled_rules.iter().any(|d| d == r.id))
            .copied()
            .collect();
        Self {
            rules,
            mode: config.mode(),
            canon_version: config.canon_version,
            allow_bypass: config.allow_bypass,
            articles: ArticleTable::canon(),
            realizers: BTreeMap::new(),
            solvers: BTreeMap::new(),
            cache: Mutex::new(VerdictCache::new(config.cache_capacity)),
        }
    }

    /// Replace the canon reference table used for citations and summaries.
    ///
    /// Cached verdicts keep the citations they were created with; call
    /// [`clear_cache`](Self::clear_cache) to re-cite them.
    #[must_use]
    pub fn with_articles(mut self, articles: ArticleTable) -> Self {
        self.articles = articles;
        self
    }

    pub fn canon_version(&self) -> &str {
        &self.canon_version
    }

    pub fn mode(&self) -> StrictnessMode {
        self.mode
    }

    pub fn allow_bypass(&self) -> bool {
        self.allow_bypass
    }

    /// Enabled rules, in execution order.
    pub fn rules(&self) -> &[RuleSpec] {
        &self.rules
    }

    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        self.rules.iter().any(|r| r.id == rule_id)
    }

    pub fn articles(&self) -> &ArticleTable {
        &self.articles
    }

    /// Move the engine to another canon version.
    ///
    /// Verdicts cached under the previous version are ignored from now on.
    pub fn set_canon_version(&mut self, canon_version: impl Into<String>) {
        self.canon_version = canon_version.into();
        tracing::info!("Canon version set to {}", self.canon_version);
    }

    // =========================================================================
    // VALIDATION
    // =========================================================================

    /// Signature of a declaration.
    pub fn signature(&self, decl: &Declaration) -> Result<Signature, CanonError> {
        compute_signature(decl)
    }

    /// Validate a declaration against the enabled canon rules.
    ///
    /// Returns the cached verdict (with its original timestamp) when one
    /// exists for the same signature under the current canon version.
    /// The only error is a failure to encode the declaration canonically.
    pub fn validate(&self, decl: &Declaration) -> Result<Verdict, CanonError> {
        let signature = compute_signature(decl)?;

        if let Some(verdict) = self.lock_cache().fresh(&signature, &self.canon_version) {
            tracing::debug!("Verdict cache hit for {}", signature.short());
            return Ok(verdict.clone());
        }

        tracing::debug!("Verdict cache miss for {}", signature.short());
        let verdict = Verdict::new(
            self.run_rules(decl),
            self.mode,
            signature,
            self.canon_version.clone(),
            Utc::now(),
        );

        let mut cache = self.lock_cache();
        // Another thread may have validated the same declaration meanwhile.
        if let Some(existing) = cache.fresh(verdict.signature(), &self.canon_version) {
            return Ok(existing.clone());
        }
        cache.insert(verdict.clone());
        drop(cache);

        tracing::debug!(
            "Validated {}: {} findings, passed={}",
            verdict.signature().short(),
            verdict.findings().len(),
            verdict.passed()
        );
        Ok(verdict)
    }

    /// Run every enabled rule and order the findings deterministically:
    /// rule order, then target id, then message.
    fn run_rules(&self, decl: &Declaration) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in &self.rules {
            let mut batch = rule.run(decl);
            for finding in &mut batch {
                if let Some(citation) = self.articles.citation(&finding.rule_id) {
                    finding.canon_article = citation.to_string();
                }
            }
            batch.sort_by(|a, b| {
                a.target_id
                    .cmp(&b.target_id)
                    .then_with(|| a.message.cmp(&b.message))
            });
            findings.extend(batch);
        }
        findings
    }

    /// Cached verdict for a declaration, without running any rule.
    ///
    /// Returns `None` if nothing is cached or the entry belongs to another
    /// canon version.
    pub fn get_cached_verdict(
        &self,
        decl: &Declaration,
    ) -> Result<Option<(Verdict, DateTime<Utc>)>, CanonError> {
        let signature = compute_signature(decl)?;
        Ok(self
            .lock_cache()
            .fresh(&signature, &self.canon_version)
            .map(|v| (v.clone(), v.timestamp())))
    }

    /// Validate and render the verdict for humans.
    pub fn validate_and_summarize(&self, decl: &Declaration) -> Result<String, CanonError> {
        let verdict = self.validate(decl)?;
        Ok(render_summary(decl.title(), &verdict, &self.articles))
    }

    /// Number of cached verdicts, stale ones included.
    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    fn lock_cache(&self) -> MutexGuard<'_, VerdictCache> {
        // Entries are replaced wholesale, so a poisoned cache is still consistent.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // REALIZATION
    // =========================================================================

    /// Realize every Form of a declaration.
    ///
    /// - `skip_validation = false`: fails with `CanonError::Validation` when
    ///   the verdict fails under the engine's mode.
    /// - `skip_validation = true`: fails with `CanonError::Bypass` unless the
    ///   engine allows bypass; otherwise proceeds and records a
    ///   `CanonBypassWarning`.
    ///
    /// No realizer runs when either error is returned. Once dispatch starts,
    /// per-form failures are collected and the remaining Forms still realize.
    pub fn realize(
        &self,
        decl: &Declaration,
        skip_validation: bool,
        context: &RealizeContext,
    ) -> Result<RealizeResult, CanonError> {
        let verdict = self.validate(decl)?;

        let bypass = if skip_validation {
            if !self.allow_bypass {
                tracing::error!(
                    "Bypass requested for {} while bypass is disabled",
                    verdict.signature().short()
                );
                return Err(CanonBypassError {
                    signature: verdict.signature().clone(),
                }
                .into());
            }
            let warning = CanonBypassWarning {
                signature: verdict.signature().clone(),
                canon_version: self.canon_version.clone(),
                verdict_passed: verdict.passed(),
                counts: verdict.counts(),
            };
            tracing::warn!("{}", warning);
            Some(warning)
        } else {
            if !verdict.passed() {
                tracing::info!(
                    "Realization blocked for {}: {} fatal, {} error",
                    verdict.signature().short(),
                    verdict.counts().fatal,
                    verdict.counts().error
                );
                return Err(CanonValidationError {
                    verdict: Box::new(verdict),
                }
                .into());
            }
            None
        };

        let mut context = context.clone();
        if context.epsilon.is_none() {
            context.epsilon = decl.epsilon();
        }

        let mut realizations = Vec::new();
        let mut failures = Vec::new();
        for form in decl.forms() {
            let Some(realizer) = self.realizers.get(&registry_key(form.kind())) else {
                tracing::debug!("No realizer for kind '{}' (form {})", form.kind(), form.id());
                failures.push(RealizeFailure::MissingRealizer(MissingRealizerError {
                    form_id: form.id().to_string(),
                    kind: form.kind().to_string(),
                }));
                continue;
            };
            match realizer.realize_form(form, &context) {
                Ok(realization) => {
                    tracing::debug!("Realized form {} with {}", form.id(), realizer.name());
                    realizations.push(realization);
                }
                Err(e) => {
                    tracing::debug!("Realizer {} failed: {}", realizer.name(), e);
                    failures.push(RealizeFailure::Realization(e));
                }
            }
        }

        Ok(RealizeResult {
            signature: verdict.signature().clone(),
            canon_version: self.canon_version.clone(),
            timestamp: Utc::now(),
            realizations,
            failures,
            bypass,
        })
    }

    // =========================================================================
    // REGISTRIES
    // =========================================================================

    /// Register the realizer for a kind.
    ///
    /// A second registration for the same kind is rejected with
    /// `CanonError::DuplicateRealizer`; use [`replace_realizer`](Self::replace_realizer)
    /// to overwrite deliberately.
    pub fn register_realizer(
        &mut self,
        kind: &str,
        realizer: Arc<dyn Realizer>,
    ) -> Result<(), CanonError> {
        let key = registry_key(kind);
        if self.realizers.contains_key(&key) {
            return Err(CanonError::DuplicateRealizer(key));
        }
        tracing::debug!("Registered realizer {} for kind '{}'", realizer.name(), key);
        self.realizers.insert(key, realizer);
        Ok(())
    }

    /// Register or overwrite the realizer for a kind, returning the previous one.
    pub fn replace_realizer(
        &mut self,
        kind: &str,
        realizer: Arc<dyn Realizer>,
    ) -> Option<Arc<dyn Realizer>> {
        self.realizers.insert(registry_key(kind), realizer)
    }

    pub fn get_realizer(&self, kind: &str) -> Option<Arc<dyn Realizer>> {
        self.realizers.get(&registry_key(kind)).cloned()
    }

    /// Kinds with a registered realizer.
    pub fn realizer_kinds(&self) -> impl Iterator<Item = &str> {
        self.realizers.keys().map(String::as_str)
    }

    /// Register the solver for a kind. Duplicates are rejected.
    pub fn register_solver(&mut self, kind: &str, solver: Arc<dyn Solver>) -> Result<(), CanonError> {
        let key = registry_key(kind);
        if self.solvers.contains_key(&key) {
            return Err(CanonError::DuplicateSolver(key));
        }
        self.solvers.insert(key, solver);
        Ok(())
    }

    pub fn get_solver(&self, kind: &str) -> Option<Arc<dyn Solver>> {
        self.solvers.get(&registry_key(kind)).cloned()
    }

    /// Solve `key = value` with the solver registered for `kind`.
    pub fn solve(&self, kind: &str, key: &str, value: f64) -> Result<SolveResult, CanonError> {
        let solver = self
            .solvers
            .get(&registry_key(kind))
            .ok_or_else(|| CanonError::MissingSolver(registry_key(kind)))?;
        Ok(solver.solve_from(key, value)?)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnsolvableError;
    use crate::plugin::Artifact;
    use crate::rules::VOID_TYPE;
    use crate::types::{ClosureStatus, Form, Trace};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
    }

    impl Counting {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Realizer for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn realize_form(
            &self,
            form: &Form,
            _context: &RealizeContext,
        ) -> Result<FormRealization, RealizationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FormRealization::new(form, Artifact::new(), self.name()))
        }
    }

    struct Identity;

    impl Solver for Identity {
        fn supported_keys(&self) -> &[&str] {
            &["half"]
        }

        fn solve_from(&self, key: &str, value: f64) -> Result<SolveResult, UnsolvableError> {
            if key != "half" {
                return Err(UnsolvableError::UnknownKey(key.to_string()));
            }
            Ok(SolveResult::new("radius", value).with_derived("half", value))
        }
    }

    fn open_trace_decl() -> Declaration {
        Declaration::new("open")
            .with_form(Form::new("f1", "circle").with_param("radius", 1))
            .with_trace(
                Trace::new("t1", "sweep")
                    .with_source_form("f1")
                    .with_frame("t")
                    .with_closure_status(ClosureStatus::Open),
            )
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CanonEngine>();
    }

    #[test]
    fn disabled_rules_are_not_run() {
        let engine = CanonEngine::with_config(EngineConfig {
            disabled_rules: vec![VOID_TYPE.to_string()],
            ..EngineConfig::default()
        })
        .expect("engine");
        assert!(!engine.is_rule_enabled(VOID_TYPE));
        assert_eq!(engine.rules().len(), CANON_RULES.len() - 1);

        let verdict = engine.validate(&open_trace_decl()).expect("validate");
        assert!(verdict.passed());
    }

    #[test]
    fn findings_are_cited_from_article_table() {
        let table = ArticleTable::canon().with_article(
            VOID_TYPE,
            crate::articles::Article::new("§9", "Void", "text"),
        );
        let engine = CanonEngine::new().with_articles(table);
        let verdict = engine.validate(&open_trace_decl()).expect("validate");
        let finding = verdict
            .findings_for_rule(VOID_TYPE)
            .next()
            .expect("void type finding");
        assert_eq!(finding.canon_article, "§9");
    }

    #[test]
    fn cache_capacity_evicts_oldest() {
        let engine = CanonEngine::with_config(EngineConfig {
            cache_capacity: 2,
            ..EngineConfig::default()
        })
        .expect("engine");
        for title in ["a", "b", "c"] {
            engine.validate(&Declaration::new(title)).expect("validate");
        }
        assert_eq!(engine.cache_len(), 2);
        let first = engine
            .get_cached_verdict(&Declaration::new("a"))
            .expect("cache lookup");
        assert!(first.is_none());
    }

    #[test]
    fn replacing_stale_entry_refreshes_its_eviction_slot() {
        let mut engine = CanonEngine::with_config(EngineConfig {
            cache_capacity: 2,
            ..EngineConfig::default()
        })
        .expect("engine");
        engine.validate(&Declaration::new("a")).expect("validate");
        engine.validate(&Declaration::new("b")).expect("validate");

        engine.set_canon_version("2.0");
        engine.validate(&Declaration::new("a")).expect("validate");
        assert_eq!(engine.cache_len(), 2);

        // "b" is now the oldest slot; "a" was re-inserted after it
        engine.validate(&Declaration::new("c")).expect("validate");
        assert_eq!(engine.cache_len(), 2);
        for (title, cached) in [("a", true), ("b", false), ("c", true)] {
            let hit = engine
                .get_cached_verdict(&Declaration::new(title))
                .expect("cache lookup");
            assert_eq!(hit.is_some(), cached, "{title}");
        }
    }

    #[test]
    #[allow(clippy::panic)]
    fn poisoned_cache_keeps_serving() {
        let engine = CanonEngine::new();
        let decl = Declaration::new("a");
        let first = engine.validate(&decl).expect("validate");

        std::thread::scope(|s| {
            let crashed = s
                .spawn(|| {
                    let _guard = engine.cache.lock();
                    panic!("worker died holding the cache lock");
                })
                .join();
            assert!(crashed.is_err());
        });
        assert!(engine.cache.is_poisoned());

        let again = engine.validate(&decl).expect("validate after poison");
        assert_eq!(again.timestamp(), first.timestamp());
        engine.validate(&Declaration::new("b")).expect("validate");
        assert_eq!(engine.cache_len(), 2);
        engine.clear_cache();
        assert_eq!(engine.cache_len(), 0);
    }

    #[test]
    fn zero_capacity_disables_cache() {
        let engine = CanonEngine::with_config(EngineConfig {
            cache_capacity: 0,
            ..EngineConfig::default()
        })
        .expect("engine");
        engine.validate(&Declaration::new("a")).expect("validate");
        assert_eq!(engine.cache_len(), 0);
    }

    #[test]
    fn clear_cache_empties_entries() {
        let engine = CanonEngine::new();
        engine.validate(&Declaration::new("a")).expect("validate");
        assert_eq!(engine.cache_len(), 1);
        engine.clear_cache();
        assert_eq!(engine.cache_len(), 0);
    }

    #[test]
    fn registry_keys_ignore_case() {
        let mut engine = CanonEngine::new();
        let realizer = Counting::new();
        engine
            .register_realizer("Circle", realizer.clone())
            .expect("register");
        assert!(engine.get_realizer(" circle ").is_some());
        assert_eq!(engine.realizer_kinds().collect::<Vec<_>>(), vec!["circle"]);

        let result = engine
            .realize(&open_trace_decl().with_form(Form::new("f2", "CIRCLE")), true, &RealizeContext::new());
        // bypass is disabled by default
        assert!(matches!(result, Err(CanonError::Bypass(_))));
        assert_eq!(realizer.calls(), 0);
    }

    #[test]
    fn replace_realizer_returns_previous() {
        let mut engine = CanonEngine::new();
        let first = Counting::new();
        let second = Counting::new();
        engine.register_realizer("cube", first.clone()).expect("register");

        let previous = engine.replace_realizer("cube", second.clone());
        assert!(previous.is_some());
        let current = engine.get_realizer("cube").expect("registered");
        let expected: Arc<dyn Realizer> = second;
        assert!(Arc::ptr_eq(&current, &expected));
    }

    #[test]
    fn solver_registry() {
        let mut engine = CanonEngine::new();
        engine
            .register_solver("segment", Arc::new(Identity))
            .expect("register");
        assert!(matches!(
            engine.register_solver("segment", Arc::new(Identity)),
            Err(CanonError::DuplicateSolver(_))
        ));

        let solved = engine.solve("segment", "half", 2.0).expect("solve");
        assert_eq!(solved.canonical_key, "radius");
        assert_eq!(solved.value, 2.0);
        assert_eq!(solved.derived.get("half"), Some(&2.0));

        assert!(matches!(
            engine.solve("segment", "girth", 1.0),
            Err(CanonError::Unsolvable(UnsolvableError::UnknownKey(_)))
        ));
        assert!(matches!(
            engine.solve("polygon", "half", 1.0),
            Err(CanonError::MissingSolver(_))
        ));
        assert_eq!(
            engine.get_solver("segment").map(|s| s.supported_keys().len()),
            Some(1)
        );
    }

    #[test]
    fn context_inherits_declaration_epsilon() {
        struct EpsilonEcho;
        impl Realizer for EpsilonEcho {
            fn name(&self) -> &str {
                "echo"
            }
            fn realize_form(
                &self,
                form: &Form,
                context: &RealizeContext,
            ) -> Result<FormRealization, RealizationError> {
                let eps = context
                    .epsilon
                    .ok_or_else(|| RealizationError::new(form.id(), "no epsilon"))?;
                Ok(FormRealization::new(
                    form,
                    Artifact::new().with_measure("epsilon", eps),
                    "echo",
                ))
            }
        }

        let mut engine = CanonEngine::new();
        engine
            .register_realizer("circle", Arc::new(EpsilonEcho))
            .expect("register");
        let decl = Declaration::new("eps")
            .with_form(Form::new("f1", "circle").with_param("radius", 1))
            .with_epsilon(0.5);

        let result = engine
            .realize(&decl, false, &RealizeContext::new())
            .expect("realize");
        let measure = result
            .get("f1")
            .and_then(|r| r.artifact.measures.get("epsilon").copied());
        assert_eq!(measure, Some(0.5));

        let overridden = engine
            .realize(&decl, false, &RealizeContext::new().with_epsilon(0.25))
            .expect("realize");
        let measure = overridden
            .get("f1")
            .and_then(|r| r.artifact.measures.get("epsilon").copied());
        assert_eq!(measure, Some(0.25));
    }

    #[test]
    fn debug_lists_registered_kinds() {
        let mut engine = CanonEngine::new();
        engine
            .register_realizer("cube", Counting::new())
            .expect("register");
        let text = format!("{:?}", engine);
        assert!(text.contains("cube"));
        assert!(text.contains("declaration_integrity"));
    }
}
