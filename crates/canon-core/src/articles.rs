//! # Canon Reference Table
//!
//! Maps rule ids to the article they enforce: a citation (`"Art. IV"`), a
//! title and the article text. The engine stamps citations onto findings and
//! renders titles in summaries.
//!
//! Hosts may supply their own table (e.g. a translated one); [`ArticleTable::canon`]
//! is the built-in edition matching the nine rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One article of the canon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Citation stamped onto findings, e.g. `"Art. I"`.
    pub citation: String,
    pub title: String,
    pub text: String,
}

impl Article {
    #[must_use]
    pub fn new(
        citation: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            citation: citation.into(),
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Rule id → article.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArticleTable {
    articles: BTreeMap<String, Article>,
}

impl ArticleTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in canon.
    #[must_use]
    pub fn canon() -> Self {
        Self::new()
            .with_article(
                "declaration_integrity",
                Article::new(
                    "Art. I",
                    "Declaration Integrity",
                    "Every identifier is declared exactly once, and every reference resolves \
                     to a declared Form or Trace.",
                ),
            )
            .with_article(
                "orientation_declaration",
                Article::new(
                    "Art. II",
                    "Orientation Declaration",
                    "A chirality-sensitive Form declares its orientation; handedness is never implicit.",
                ),
            )
            .with_article(
                "motion_as_parameter",
                Article::new(
                    "Art. III",
                    "Motion as Parameter",
                    "Motion is a declared parameter. Every Trace names the frame in which it moves.",
                ),
            )
            .with_article(
                "no_implicit_reflection",
                Article::new(
                    "Art. IV",
                    "No Implicit Reflection",
                    "Mirroring is declared as a relation, never inferred from matching shapes.",
                ),
            )
            .with_article(
                "epsilon_declaration",
                Article::new(
                    "Art. V",
                    "Epsilon Declaration",
                    "A numeric invariant is compared under a declared, positive, finite tolerance.",
                ),
            )
            .with_article(
                "truncation_declaration",
                Article::new(
                    "Art. VI",
                    "Truncation Declaration",
                    "A recursive Form iterated beyond the canonical depth declares its truncation.",
                ),
            )
            .with_article(
                "symmetry_declaration",
                Article::new(
                    "Art. VII",
                    "Symmetry Declaration",
                    "A Form whose identity rests on symmetry declares its symmetry class.",
                ),
            )
            .with_article(
                "curvature_class",
                Article::new(
                    "Art. VIII",
                    "Curvature Class",
                    "A Form of varying curvature classifies its curvature.",
                ),
            )
            .with_article(
                "void_type",
                Article::new(
                    "Art. IX",
                    "Void Type",
                    "An open Trace classifies the void its motion reveals.",
                ),
            )
    }

    /// Add or replace an article.
    #[must_use]
    pub fn with_article(mut self, rule_id: impl Into<String>, article: Article) -> Self {
        self.articles.insert(rule_id.into(), article);
        self
    }

    pub fn get(&self, rule_id: &str) -> Option<&Article> {
        self.articles.get(rule_id)
    }

    /// Citation for a rule, if the table knows it.
    pub fn citation(&self, rule_id: &str) -> Option<&str> {
        self.get(rule_id).map(|a| a.citation.as_str())
    }

    /// Articles in rule-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Article)> {
        self.articles.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }
}
