// Moderator: the decision-fusion engine.
//
// One check: truncate, scan lexically, optionally ask the external
// classifier, blend the signals into a risk score and category, then apply
// the current policy (block flag, violation logging). Each check builds its
// own verdict; the only shared state is the term set (read-locked while
// scanning), the policy (copied out at the start of a check) and the store
// (appended to after the verdict is final).

use std::sync::{Arc, PoisonError, RwLock};

use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::score::{compute_risk_score, Category, FusionMode};
use super::verdict::{BatchEntry, CheckOutcome, FusedVerdict};
use crate::classifier::{ExternalResult, ImageSignalSource, SignalSource};
use crate::config::EnginePolicy;
use crate::lexical::LexicalScanner;
use crate::output::truncate_chars;
use crate::store::{ViolationRecord, ViolationStore};
use crate::terms::RestrictedTermSet;

/// Texts longer than this many characters are cut before analysis.
pub const MAX_TEXT_CHARS: usize = 512;
/// Length of the text preview kept in verdicts and violation records.
pub const PREVIEW_CHARS: usize = 100;
/// Largest batch accepted by `check_batch`.
pub const MAX_BATCH_SIZE: usize = 100;
/// Checks in flight at once during a batch.
const BATCH_CONCURRENCY: usize = 8;

const UNKNOWN_USER: &str = "unknown";

/// A single moderation request as the transport layer sees it.
#[derive(Debug, Clone, Default)]
pub struct CheckRequest {
    pub text: String,
    pub user_id: Option<String>,
    /// Ask the external classifier as well as the lexical scanner.
    pub use_external: bool,
    pub mode: FusionMode,
    pub image: Option<Vec<u8>>,
}

impl CheckRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

pub struct Moderator {
    scanner: LexicalScanner,
    classifier: Arc<dyn SignalSource>,
    image_classifier: Option<Arc<dyn ImageSignalSource>>,
    store: Arc<dyn ViolationStore>,
    policy: RwLock<EnginePolicy>,
}

impl Moderator {
    pub fn new(
        terms: Arc<RestrictedTermSet>,
        classifier: Arc<dyn SignalSource>,
        store: Arc<dyn ViolationStore>,
    ) -> Self {
        Self {
            scanner: LexicalScanner::new(terms),
            classifier,
            image_classifier: None,
            store,
            policy: RwLock::new(EnginePolicy::default()),
        }
    }

    pub fn with_policy(self, policy: EnginePolicy) -> Self {
        Self {
            policy: RwLock::new(policy),
            ..self
        }
    }

    pub fn with_image_classifier(self, image_classifier: Arc<dyn ImageSignalSource>) -> Self {
        Self {
            image_classifier: Some(image_classifier),
            ..self
        }
    }

    pub fn terms(&self) -> &Arc<RestrictedTermSet> {
        self.scanner.terms()
    }

    pub fn classifier(&self) -> &Arc<dyn SignalSource> {
        &self.classifier
    }

    pub fn store(&self) -> &Arc<dyn ViolationStore> {
        &self.store
    }

    /// Snapshot of the current policy.
    pub fn policy(&self) -> EnginePolicy {
        self.policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merge a partial policy update; returns the keys that were applied.
    pub fn update_policy(&self, updates: &Map<String, Value>) -> Vec<String> {
        let applied = self
            .policy
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .merge(updates);
        info!(applied = ?applied, "Policy updated");
        applied
    }

    /// Evaluate `text` with the any-signal policy and no user attribution.
    ///
    /// Never fails: empty input yields a safe verdict, and classifier or
    /// store failures only degrade the result.
    pub async fn evaluate(&self, text: &str, use_external: bool) -> FusedVerdict {
        self.evaluate_with_mode(text, use_external, FusionMode::AnySignal)
            .await
    }

    /// Evaluate `text` with an explicit fusion mode.
    pub async fn evaluate_with_mode(
        &self,
        text: &str,
        use_external: bool,
        mode: FusionMode,
    ) -> FusedVerdict {
        self.run(text, UNKNOWN_USER, use_external, None, mode)
            .await
            .0
    }

    /// Full check with input validation and the transport envelope.
    ///
    /// Rejects empty or whitespace-only text; that rejection is the only
    /// error this returns.
    pub async fn check(&self, request: &CheckRequest) -> Result<CheckOutcome> {
        if request.text.trim().is_empty() {
            anyhow::bail!("Text must be a non-empty string");
        }

        let user = request.user_id.as_deref().unwrap_or(UNKNOWN_USER);
        let (verdict, policy) = self
            .run(
                &request.text,
                user,
                request.use_external,
                request.image.as_deref(),
                request.mode,
            )
            .await;

        Ok(CheckOutcome::new(
            verdict,
            policy.auto_block,
            request.user_id.clone(),
        ))
    }

    /// Check up to `MAX_BATCH_SIZE` texts. Invalid entries get a per-item
    /// error instead of failing the batch; results keep input order.
    pub async fn check_batch(
        &self,
        texts: &[String],
        user_id: Option<&str>,
        use_external: bool,
        mode: FusionMode,
    ) -> Result<Vec<BatchEntry>> {
        if texts.len() > MAX_BATCH_SIZE {
            anyhow::bail!(
                "Batch size cannot exceed {} texts (got {})",
                MAX_BATCH_SIZE,
                texts.len()
            );
        }

        let base_user = user_id.unwrap_or(UNKNOWN_USER);
        let entries: Vec<BatchEntry> = stream::iter(texts.iter().enumerate())
            .map(move |(index, text)| async move {
                let request = CheckRequest {
                    text: text.clone(),
                    user_id: Some(format!("{base_user}_batch_{index}")),
                    use_external,
                    mode,
                    image: None,
                };
                let text_preview = truncate_chars(text, PREVIEW_CHARS);
                match self.check(&request).await {
                    Ok(outcome) => BatchEntry {
                        index,
                        text_preview,
                        outcome: Some(outcome),
                        error: None,
                    },
                    Err(e) => BatchEntry {
                        index,
                        text_preview,
                        outcome: None,
                        error: Some(e.to_string()),
                    },
                }
            })
            .buffered(BATCH_CONCURRENCY)
            .collect()
            .await;

        Ok(entries)
    }

    async fn run(
        &self,
        text: &str,
        user_id: &str,
        use_external: bool,
        image: Option<&[u8]>,
        mode: FusionMode,
    ) -> (FusedVerdict, EnginePolicy) {
        let policy = self.policy();

        let (analyzed, truncated) = truncate_for_analysis(text);
        if truncated {
            warn!(limit = MAX_TEXT_CHARS, "Text truncated before analysis");
        }

        let lexical = self.scanner.scan(&analyzed);

        let external = if use_external {
            self.classifier.classify(&analyzed).await
        } else {
            ExternalResult::unavailable()
        };

        let image = match (image, &self.image_classifier) {
            (Some(bytes), Some(source)) => Some(source.classify_image(bytes).await),
            (Some(_), None) => {
                debug!("Image supplied but no image classifier attached");
                None
            }
            _ => None,
        };

        let risk_score = compute_risk_score(&lexical, &external);
        let category = Category::from_score(risk_score);
        let is_restricted = mode.is_restricted(risk_score, &lexical, &external, image.as_ref());

        let verdict = FusedVerdict {
            category,
            risk_score,
            is_restricted,
            lexical,
            external,
            image,
            mode,
            truncated,
            timestamp: Utc::now(),
            text_preview: truncate_chars(&analyzed, PREVIEW_CHARS),
        };

        if verdict.is_restricted {
            warn!(
                user_id,
                category = %verdict.category,
                risk_score = verdict.risk_score,
                matched = ?verdict.lexical.matched_terms,
                "Content violation detected"
            );
            if policy.log_violations {
                self.record_violation(&verdict, user_id).await;
            }
        }

        (verdict, policy)
    }

    /// Persist a violation. Failures are logged, never returned: the verdict
    /// is already final.
    async fn record_violation(&self, verdict: &FusedVerdict, user_id: &str) {
        let record = ViolationRecord::from_verdict(verdict, user_id);
        if let Err(e) = self.store.append(&record).await {
            error!(
                error = %format!("{e:#}"),
                store = %self.store.location(),
                "Failed to record violation"
            );
        }
    }
}

/// Cut `text` to `MAX_TEXT_CHARS` characters on a char boundary.
fn truncate_for_analysis(text: &str) -> (String, bool) {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((byte_idx, _)) => (text[..byte_idx].to_string(), true),
        None => (text.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DisabledSource;
    use crate::store::MemoryStore;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FailingStore;

    #[async_trait]
    impl ViolationStore for FailingStore {
        async fn append(&self, _record: &ViolationRecord) -> Result<()> {
            Err(anyhow!("disk full"))
        }

        async fn history(&self) -> Result<Vec<ViolationRecord>> {
            Err(anyhow!("unreadable"))
        }

        fn location(&self) -> String {
            "failing".to_string()
        }
    }

    fn moderator(store: Arc<dyn ViolationStore>) -> Moderator {
        Moderator::new(
            Arc::new(RestrictedTermSet::with_defaults()),
            Arc::new(DisabledSource),
            store,
        )
    }

    #[test]
    fn test_truncate_for_analysis_respects_char_boundaries() {
        let text = "é".repeat(600);
        let (cut, truncated) = truncate_for_analysis(&text);
        assert!(truncated);
        assert_eq!(cut.chars().count(), MAX_TEXT_CHARS);

        let (same, truncated) = truncate_for_analysis("short");
        assert!(!truncated);
        assert_eq!(same, "short");
    }

    #[tokio::test]
    async fn test_store_failure_does_not_fail_check() {
        let moderator = moderator(Arc::new(FailingStore));
        let outcome = moderator
            .check(&CheckRequest::new("I hate mondays"))
            .await
            .unwrap();
        assert!(outcome.verdict.is_restricted);
    }

    #[tokio::test]
    async fn test_log_violations_off_skips_store() {
        let store = Arc::new(MemoryStore::new());
        let moderator = moderator(store.clone()).with_policy(EnginePolicy {
            log_violations: false,
            ..EnginePolicy::default()
        });

        moderator.evaluate("kill kill kill", false).await;
        assert_eq!(store.total_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_check_rejects_blank_text() {
        let store = Arc::new(MemoryStore::new());
        let moderator = moderator(store.clone());
        assert!(moderator.check(&CheckRequest::new("   ")).await.is_err());
        assert_eq!(store.total_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_policy_changes_blocking() {
        let moderator = moderator(Arc::new(MemoryStore::new()));
        let updates = serde_json::json!({ "auto_block": false, "bogus": 1 });
        let applied = moderator.update_policy(updates.as_object().unwrap());
        assert_eq!(applied, vec!["auto_block".to_string()]);

        let outcome = moderator
            .check(&CheckRequest::new("this is a scam"))
            .await
            .unwrap();
        assert!(outcome.verdict.is_restricted);
        assert!(!outcome.block_content);
    }
}
