// Unit tests for scoring and output functions.
//
// Tests isolated pure functions: Category::from_score boundary conditions,
// compute_risk_score monotonicity, lexical severity/confidence, and
// truncate_chars UTF-8 safety.

use std::sync::Arc;

use sieve::classifier::ExternalResult;
use sieve::fusion::{compute_risk_score, Category};
use sieve::lexical::{Confidence, LexicalScanner};
use sieve::output::truncate_chars;
use sieve::terms::RestrictedTermSet;

fn default_scanner() -> LexicalScanner {
    LexicalScanner::new(Arc::new(RestrictedTermSet::with_defaults()))
}

// ============================================================
// Category::from_score: boundary conditions
// ============================================================

#[test]
fn category_exact_boundary_hate_speech() {
    assert_eq!(Category::from_score(0.8), Category::HateSpeech);
}

#[test]
fn category_just_below_hate_speech() {
    assert_eq!(Category::from_score(0.7999), Category::Violence);
}

#[test]
fn category_exact_boundary_violence() {
    assert_eq!(Category::from_score(0.6), Category::Violence);
}

#[test]
fn category_just_below_violence() {
    assert_eq!(Category::from_score(0.5999), Category::Inappropriate);
}

#[test]
fn category_exact_boundary_inappropriate() {
    assert_eq!(Category::from_score(0.4), Category::Inappropriate);
}

#[test]
fn category_exact_boundary_spam() {
    assert_eq!(Category::from_score(0.2), Category::Spam);
}

#[test]
fn category_just_below_spam() {
    assert_eq!(Category::from_score(0.1999), Category::Safe);
}

#[test]
fn category_is_stable_for_same_score() {
    for score in [0.0, 0.2, 0.4, 0.6, 0.8, 1.0] {
        assert_eq!(Category::from_score(score), Category::from_score(score));
    }
}

// ============================================================
// compute_risk_score: monotonicity
// ============================================================

#[test]
fn external_signal_never_lowers_score() {
    let lexical = default_scanner().scan("kill it");
    assert!(lexical.is_restricted);

    let without = compute_risk_score(&lexical, &ExternalResult::unavailable());
    let with = compute_risk_score(&lexical, &ExternalResult::signal(true));
    assert!(with >= without, "{with} < {without}");
    assert!((with - 1.0).abs() < 1e-9);
}

#[test]
fn score_stays_within_unit_interval() {
    let scanner = default_scanner();
    for text in ["", "hello", "hate hate hate", "kill"] {
        let lexical = scanner.scan(text);
        for external in [
            ExternalResult::unavailable(),
            ExternalResult::signal(false),
            ExternalResult::signal(true),
        ] {
            let score = compute_risk_score(&lexical, &external);
            assert!((0.0..=1.0).contains(&score), "score {score} out of range");
        }
    }
}

// ============================================================
// LexicalScanner
// ============================================================

#[test]
fn all_restricted_tokens_give_full_severity() {
    let result = default_scanner().scan("Hate KILL scam");
    assert!(result.is_restricted);
    assert!((result.severity - 1.0).abs() < 1e-9);
    assert_eq!(result.confidence, Confidence::High);
}

#[test]
fn punctuation_prevents_match() {
    let result = default_scanner().scan("I hate. You");
    assert!(!result.is_restricted);
    assert!(result.matched_terms.is_empty());
}

#[test]
fn low_density_match_has_low_confidence() {
    // 1 of 25 tokens = 0.04 severity
    let mut words = vec!["word"; 24];
    words.push("spam");
    let result = default_scanner().scan(&words.join(" "));
    assert!(result.is_restricted);
    assert_eq!(result.confidence, Confidence::Low);
}

#[test]
fn medium_density_match_has_medium_confidence() {
    // 1 of 12 tokens ≈ 0.083 severity
    let mut words = vec!["word"; 11];
    words.push("spam");
    let result = default_scanner().scan(&words.join(" "));
    assert_eq!(result.confidence, Confidence::Medium);
}

// ============================================================
// truncate_chars: UTF-8 safety
// ============================================================

#[test]
fn truncate_short_text_unchanged() {
    assert_eq!(truncate_chars("hello", 100), "hello");
}

#[test]
fn truncate_exact_length_unchanged() {
    let text = "a".repeat(100);
    assert_eq!(truncate_chars(&text, 100), text);
}

#[test]
fn truncate_long_text_appends_ellipsis() {
    let text = "a".repeat(150);
    let preview = truncate_chars(&text, 100);
    assert_eq!(preview.chars().count(), 103);
    assert!(preview.ends_with("..."));
}

#[test]
fn truncate_multibyte_does_not_panic() {
    let text = "🔥".repeat(120);
    let preview = truncate_chars(&text, 100);
    assert_eq!(preview.chars().count(), 103);
}
