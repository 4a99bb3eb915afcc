//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use canon_core::{CanonEngine, CanonError, CanonValidationError, Declaration, EngineConfig};
use std::path::{Path, PathBuf};

// =============================================================================
// FILE INPUT
// =============================================================================

/// Maximum size of a declaration file (16 MB).
const MAX_DECLARATION_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CanonError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CanonError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CanonError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input path.
///
/// Canonicalizes the path (resolving symlinks and "..") and ensures it names
/// an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CanonError> {
    let canonical = path.canonicalize().map_err(|e| {
        CanonError::Io(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CanonError::Io(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Read a size-checked input file.
pub fn read_input_file(path: &Path, max_size: u64) -> Result<Vec<u8>, CanonError> {
    let validated_path = validate_file_path(path)?;
    validate_file_size(&validated_path, max_size)?;
    std::fs::read(&validated_path).map_err(|e| CanonError::Io(format!("Read file: {}", e)))
}

/// Load a declaration from a JSON file.
pub fn load_declaration(path: &Path) -> Result<Declaration, CanonError> {
    tracing::debug!("Loading declaration from {:?}", path);
    let contents = read_input_file(path, MAX_DECLARATION_FILE_SIZE)?;
    serde_json::from_slice(&contents)
        .map_err(|e| CanonError::Serialization(format!("Invalid declaration: {}", e)))
}

fn render_json(value: &serde_json::Value) -> Result<String, CanonError> {
    serde_json::to_string_pretty(value).map_err(|e| CanonError::Serialization(e.to_string()))
}

fn print_json(value: &serde_json::Value) -> Result<(), CanonError> {
    println!("{}", render_json(value)?);
    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Validate a declaration. A failing verdict is returned as an error.
pub fn cmd_validate(
    engine: &CanonEngine,
    file: &Path,
    json_mode: bool,
    verbose: bool,
) -> Result<(), CanonError> {
    let decl = load_declaration(file)?;
    let verdict = engine.validate(&decl)?;

    if json_mode {
        print_json(&serde_json::json!({
            "title": decl.title(),
            "verdict": verdict,
        }))?;
    } else {
        let counts = verdict.counts();
        println!("Canon Verdict");
        println!("=============");
        println!("Declaration: {}", decl.title());
        println!("Signature:   {}", verdict.signature());
        println!("Canon:       {} ({})", verdict.canon_version(), verdict.mode());
        println!(
            "Findings:    {} fatal, {} error, {} warning, {} info",
            counts.fatal, counts.error, counts.warning, counts.info
        );
        println!();
        for finding in verdict.findings() {
            println!("  {}", finding);
            if let Some(fix) = finding.suggested_fix.as_ref().filter(|_| verbose) {
                println!("      fix: {}", fix);
            }
        }
        println!();
        println!("Result: {}", if verdict.passed() { "PASSED" } else { "FAILED" });
    }

    if !verdict.passed() {
        return Err(CanonValidationError {
            verdict: Box::new(verdict),
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// SUMMARY COMMAND
// =============================================================================

pub fn cmd_summary(engine: &CanonEngine, file: &Path, json_mode: bool) -> Result<(), CanonError> {
    let decl = load_declaration(file)?;
    let summary = engine.validate_and_summarize(&decl)?;

    if json_mode {
        print_json(&serde_json::json!({ "summary": summary }))?;
    } else {
        print!("{}", summary);
    }
    Ok(())
}

// =============================================================================
// SIGNATURE COMMAND
// =============================================================================

pub fn cmd_signature(engine: &CanonEngine, file: &Path, json_mode: bool) -> Result<(), CanonError> {
    let decl = load_declaration(file)?;
    let signature = engine.signature(&decl)?;

    if json_mode {
        print_json(&serde_json::json!({
            "title": decl.title(),
            "signature": signature,
        }))?;
    } else {
        println!("{}", signature);
    }
    Ok(())
}

// =============================================================================
// ARTICLES COMMAND
// =============================================================================

/// List the canon reference table in rule order.
pub fn cmd_articles(engine: &CanonEngine, json_mode: bool) -> Result<(), CanonError> {
    if json_mode {
        let articles: Vec<_> = engine
            .rules()
            .iter()
            .filter_map(|rule| {
                engine.articles().get(rule.id).map(|article| {
                    serde_json::json!({
                        "rule_id": rule.id,
                        "citation": article.citation,
                        "title": article.title,
                        "text": article.text,
                    })
                })
            })
            .collect();
        print_json(&serde_json::Value::Array(articles))?;
        return Ok(());
    }

    println!("Canon Articles");
    println!("==============");
    for rule in engine.rules() {
        let Some(article) = engine.articles().get(rule.id) else {
            continue;
        };
        println!();
        println!("{} {}  [{}]", article.citation, article.title, rule.id);
        println!("  {}", article.text);
    }
    Ok(())
}

// =============================================================================
// CONFIG COMMAND
// =============================================================================

pub fn cmd_config(config: &EngineConfig, json_mode: bool) -> Result<(), CanonError> {
    if json_mode {
        let value = serde_json::to_value(config)
            .map_err(|e| CanonError::Serialization(e.to_string()))?;
        print_json(&value)?;
        return Ok(());
    }

    println!("Engine Configuration");
    println!("====================");
    println!("Canon version:  {}", config.canon_version);
    println!("Mode:           {}", config.mode());
    println!("Allow bypass:   {}", config.allow_bypass);
    println!("Cache capacity: {}", config.cache_capacity);
    if config.disabled_rules.is_empty() {
        println!("Disabled rules: none");
    } else {
        println!("Disabled rules: {}", config.disabled_rules.join(", "));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
