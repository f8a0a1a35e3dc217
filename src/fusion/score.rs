// Risk score formula and category mapping.
//
// The score is additive: a lexical hit contributes 0.6 and a positive,
// available external signal contributes 0.4, clamped to [0, 1]. Categories
// are fixed bands over that score, checked from the top down.

use serde::{Deserialize, Serialize};

use crate::classifier::ExternalResult;
use crate::lexical::LexicalResult;

/// Weight of a lexical match in the risk score.
pub const LEXICAL_WEIGHT: f64 = 0.6;
/// Weight of a positive external signal in the risk score.
pub const EXTERNAL_WEIGHT: f64 = 0.4;
/// Risk score at or above which the score-threshold mode flags text.
pub const UNSAFE_SCORE: f64 = 0.4;

/// Content category derived from the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Safe,
    Spam,
    Inappropriate,
    Violence,
    HateSpeech,
}

impl Category {
    /// Determine the category from a risk score (0.0-1.0).
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 0.8 => Category::HateSpeech,
            s if s >= 0.6 => Category::Violence,
            s if s >= 0.4 => Category::Inappropriate,
            s if s >= 0.2 => Category::Spam,
            _ => Category::Safe,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Safe => "safe",
            Category::Spam => "spam",
            Category::Inappropriate => "inappropriate",
            Category::Violence => "violence",
            Category::HateSpeech => "hate_speech",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "safe" => Ok(Category::Safe),
            "spam" => Ok(Category::Spam),
            "inappropriate" => Ok(Category::Inappropriate),
            "violence" => Ok(Category::Violence),
            "hate_speech" => Ok(Category::HateSpeech),
            other => anyhow::bail!("Unknown category: {other}"),
        }
    }
}

/// How the final unsafe flag is decided.
///
/// Both policies exist in the wild; the call site picks one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMode {
    /// Unsafe only when the blended risk score reaches `UNSAFE_SCORE`.
    ScoreThreshold,
    /// Unsafe when the score reaches `UNSAFE_SCORE` or any single signal
    /// fires on its own (lexical, external or image).
    #[default]
    AnySignal,
}

impl FusionMode {
    /// Decide the final unsafe flag.
    pub fn is_restricted(
        &self,
        risk_score: f64,
        lexical: &LexicalResult,
        external: &ExternalResult,
        image: Option<&ExternalResult>,
    ) -> bool {
        let over_threshold = risk_score >= UNSAFE_SCORE;
        match self {
            FusionMode::ScoreThreshold => over_threshold,
            FusionMode::AnySignal => {
                over_threshold
                    || lexical.is_restricted
                    || external.fires()
                    || image.is_some_and(ExternalResult::fires)
            }
        }
    }
}

/// Compute the blended risk score from the two text signals.
pub fn compute_risk_score(lexical: &LexicalResult, external: &ExternalResult) -> f64 {
    let mut score = 0.0;
    if lexical.is_restricted {
        score += LEXICAL_WEIGHT;
    }
    if external.fires() {
        score += EXTERNAL_WEIGHT;
    }
    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::Confidence;

    fn lexical(hit: bool) -> LexicalResult {
        LexicalResult {
            is_restricted: hit,
            matched_terms: if hit { vec!["hate".into()] } else { vec![] },
            severity: if hit { 0.5 } else { 0.0 },
            confidence: if hit { Confidence::High } else { Confidence::Low },
        }
    }

    #[test]
    fn test_score_combinations() {
        let none = ExternalResult::unavailable();
        let flagged = ExternalResult::signal(true);
        assert_eq!(compute_risk_score(&lexical(false), &none), 0.0);
        assert!((compute_risk_score(&lexical(true), &none) - 0.6).abs() < 1e-9);
        assert!((compute_risk_score(&lexical(false), &flagged) - 0.4).abs() < 1e-9);
        assert!((compute_risk_score(&lexical(true), &flagged) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unavailable_positive_flag_is_ignored() {
        let bogus = ExternalResult {
            has_signal: true,
            available: false,
        };
        assert_eq!(compute_risk_score(&lexical(false), &bogus), 0.0);
    }

    #[test]
    fn test_category_from_fused_scores() {
        assert_eq!(Category::from_score(1.0), Category::HateSpeech);
        assert_eq!(Category::from_score(0.6), Category::Violence);
        assert_eq!(Category::from_score(0.4), Category::Inappropriate);
        assert_eq!(Category::from_score(0.0), Category::Safe);
    }

    #[test]
    fn test_category_round_trips_through_str() {
        for category in [
            Category::Safe,
            Category::Spam,
            Category::Inappropriate,
            Category::Violence,
            Category::HateSpeech,
        ] {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert!("nudity".parse::<Category>().is_err());
    }

    #[test]
    fn test_modes_differ_only_on_image_signal() {
        let none = ExternalResult::unavailable();
        let image = ExternalResult::signal(true);
        let lex = lexical(false);

        assert!(!FusionMode::ScoreThreshold.is_restricted(0.0, &lex, &none, Some(&image)));
        assert!(FusionMode::AnySignal.is_restricted(0.0, &lex, &none, Some(&image)));
    }
}
