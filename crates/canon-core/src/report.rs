//! Human-readable rendering of verdicts for logs and UIs.

use crate::articles::ArticleTable;
use crate::verdict::Verdict;

/// Render a verdict as a multi-line summary.
///
/// ```text
/// Canon verdict for "rose window": FAILED (strict, canon 1.0)
/// Signature: 3f2a...
/// Findings:  0 fatal, 1 error, 0 warning, 0 info
///   [ERROR] Art. IX Void Type: Open Trace 't1' has no declared void type (t1)
///           fix: declare void_type, or close the trace
/// ```
#[must_use]
pub fn render_summary(title: &str, verdict: &Verdict, articles: &ArticleTable) -> String {
    let counts = verdict.counts();
    let mut out = String::new();

    out.push_str(&format!(
        "Canon verdict for \"{}\": {} ({}, canon {})\n",
        title,
        if verdict.passed() { "PASSED" } else { "FAILED" },
        verdict.mode(),
        verdict.canon_version()
    ));
    out.push_str(&format!("Signature: {}\n", verdict.signature()));
    out.push_str(&format!(
        "Findings:  {} fatal, {} error, {} warning, {} info\n",
        counts.fatal, counts.error, counts.warning, counts.info
    ));

    for finding in verdict.findings() {
        let title = articles
            .get(&finding.rule_id)
            .map(|a| a.title.as_str())
            .unwrap_or(finding.rule_id.as_str());
        out.push_str(&format!(
            "  [{}] {} {}: {}",
            finding.severity, finding.canon_article, title, finding.message
        ));
        if let Some(target) = &finding.target_id {
            out.push_str(&format!(" ({})", target));
        }
        out.push('\n');
        if let Some(fix) = &finding.suggested_fix {
            out.push_str(&format!("          fix: {}\n", fix));
        }
    }

    out
}
