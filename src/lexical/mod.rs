// Lexical scanning: tokenizes text and scores it against the restricted terms.
//
// Tokenization is deliberately literal: lowercase, then split on whitespace.
// Punctuation is not stripped, so "word." does not match "word".

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::terms::RestrictedTermSet;

/// How much of the text matched, bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    /// Bucket a severity ratio: above 0.1 is high, above 0.05 medium.
    pub fn from_severity(severity: f64) -> Self {
        match severity {
            s if s > 0.1 => Confidence::High,
            s if s > 0.05 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of scanning one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexicalResult {
    pub is_restricted: bool,
    /// Matching tokens in the order they appear. Repeated tokens are
    /// repeated here, so this can be longer than the number of distinct terms.
    pub matched_terms: Vec<String>,
    /// matched token count / total token count, 0 for empty input.
    pub severity: f64,
    pub confidence: Confidence,
}

impl LexicalResult {
    fn empty() -> Self {
        Self {
            is_restricted: false,
            matched_terms: Vec::new(),
            severity: 0.0,
            confidence: Confidence::Low,
        }
    }
}

/// Scores text against a shared RestrictedTermSet.
#[derive(Clone)]
pub struct LexicalScanner {
    terms: Arc<RestrictedTermSet>,
}

impl LexicalScanner {
    pub fn new(terms: Arc<RestrictedTermSet>) -> Self {
        Self { terms }
    }

    pub fn terms(&self) -> &Arc<RestrictedTermSet> {
        &self.terms
    }

    /// Scan `text`. Pure apart from a shared read lock on the term set.
    pub fn scan(&self, text: &str) -> LexicalResult {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();
        if tokens.is_empty() {
            return LexicalResult::empty();
        }

        let matched_terms: Vec<String> = {
            let terms = self.terms.read();
            tokens
                .iter()
                .filter(|token| terms.contains(**token))
                .map(|token| token.to_string())
                .collect()
        };

        let severity = matched_terms.len() as f64 / tokens.len() as f64;

        LexicalResult {
            is_restricted: !matched_terms.is_empty(),
            matched_terms,
            severity,
            confidence: Confidence::from_severity(severity),
        }
    }
}
