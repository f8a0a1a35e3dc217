// Verdict types: what one check produces.
//
// FusedVerdict is the engine's decision for one text. CheckOutcome wraps it
// in the envelope the transport layer serializes: decision, action, reasons
// and the blocking flag derived from the current policy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::score::{Category, FusionMode};
use crate::classifier::ExternalResult;
use crate::lexical::LexicalResult;

/// The fused decision for a single text. Produced once per check, never shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedVerdict {
    pub category: Category,
    pub risk_score: f64,
    pub is_restricted: bool,
    pub lexical: LexicalResult,
    pub external: ExternalResult,
    /// Present only when an image was supplied and an image source is attached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ExternalResult>,
    pub mode: FusionMode,
    /// The input was longer than the analysis limit and was cut.
    pub truncated: bool,
    pub timestamp: DateTime<Utc>,
    /// At most 100 characters of the analyzed text, plus "..." when cut.
    pub text_preview: String,
}

impl FusedVerdict {
    pub fn decision(&self) -> Decision {
        if self.is_restricted {
            Decision::Unsafe
        } else {
            Decision::Safe
        }
    }

    /// Human-readable reasons for an unsafe verdict, one per signal that fired.
    pub fn reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if !self.is_restricted {
            return reasons;
        }

        if self.lexical.is_restricted {
            reasons.push(format!(
                "Text contains restricted words: {}",
                self.lexical.matched_terms.join(", ")
            ));
        }
        if self.external.fires() {
            reasons.push("External classifier flagged profanity".to_string());
        }
        if self.image.as_ref().is_some_and(ExternalResult::fires) {
            reasons.push("Image classified as unsafe".to_string());
        }
        if reasons.is_empty() {
            reasons.push("Text classified as inappropriate".to_string());
        }
        reasons
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Safe,
    Unsafe,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Safe => "safe",
            Decision::Unsafe => "unsafe",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Block,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::Block => "block",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Envelope returned to the transport layer for one check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub decision: Decision,
    pub action: Action,
    /// Set when the policy has auto_block on and the verdict is unsafe.
    pub block_content: bool,
    pub reasons: Vec<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Blocked content attributed to a user: the user should be warned.
    pub user_warning: bool,
    pub content_removed: bool,
    pub verdict: FusedVerdict,
}

impl CheckOutcome {
    pub(crate) fn new(verdict: FusedVerdict, auto_block: bool, user_id: Option<String>) -> Self {
        let decision = verdict.decision();
        let unsafe_content = decision == Decision::Unsafe;
        let (action, message) = if unsafe_content {
            (Action::Block, "Content blocked due to policy violation")
        } else {
            (Action::Allow, "Content approved")
        };
        let attributed = unsafe_content && user_id.is_some();

        Self {
            decision,
            action,
            block_content: auto_block && unsafe_content,
            reasons: verdict.reasons(),
            message: message.to_string(),
            user_id,
            user_warning: attributed,
            content_removed: attributed,
            verdict,
        }
    }
}

/// One item of a batch check. Exactly one of `outcome` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub index: usize,
    pub text_preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CheckOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexical::Confidence;

    fn verdict(lexical_hit: bool, external: ExternalResult, is_restricted: bool) -> FusedVerdict {
        FusedVerdict {
            category: Category::Safe,
            risk_score: 0.0,
            is_restricted,
            lexical: LexicalResult {
                is_restricted: lexical_hit,
                matched_terms: if lexical_hit {
                    vec!["kill".into(), "hate".into()]
                } else {
                    vec![]
                },
                severity: 0.0,
                confidence: Confidence::Low,
            },
            external,
            image: None,
            mode: FusionMode::AnySignal,
            truncated: false,
            timestamp: Utc::now(),
            text_preview: String::new(),
        }
    }

    #[test]
    fn test_reasons_list_each_signal() {
        let v = verdict(true, ExternalResult::signal(true), true);
        assert_eq!(
            v.reasons(),
            vec![
                "Text contains restricted words: kill, hate".to_string(),
                "External classifier flagged profanity".to_string(),
            ]
        );
    }

    #[test]
    fn test_safe_verdict_has_no_reasons() {
        let v = verdict(false, ExternalResult::unavailable(), false);
        assert!(v.reasons().is_empty());
    }

    #[test]
    fn test_outcome_blocks_only_with_auto_block() {
        let unsafe_verdict = verdict(true, ExternalResult::unavailable(), true);

        let blocked = CheckOutcome::new(unsafe_verdict.clone(), true, None);
        assert_eq!(blocked.action, Action::Block);
        assert!(blocked.block_content);
        assert!(!blocked.user_warning);

        let flagged = CheckOutcome::new(unsafe_verdict, false, Some("u1".into()));
        assert_eq!(flagged.decision, Decision::Unsafe);
        assert_eq!(flagged.action, Action::Block);
        assert!(!flagged.block_content);
        assert!(flagged.user_warning);
        assert!(flagged.content_removed);
    }

    #[test]
    fn test_safe_outcome_allows() {
        let outcome = CheckOutcome::new(
            verdict(false, ExternalResult::unavailable(), false),
            true,
            Some("u1".into()),
        );
        assert_eq!(outcome.action, Action::Allow);
        assert_eq!(outcome.message, "Content approved");
        assert!(!outcome.block_content);
        assert!(!outcome.user_warning);
    }
}
