// Violation store: append-only history of unsafe verdicts.
//
// Implementors: JsonlStore (one JSON object per line in a file),
// MemoryStore (process-local, for embedding and tests), and SqliteStore
// (rusqlite, behind the `sqlite` feature). The engine only appends;
// statistics read the whole history and filter in memory.

pub mod jsonl;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::ExternalResult;
use crate::fusion::{Category, FusedVerdict};

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Window used for `ViolationStats::recent_violations`.
pub const RECENT_WINDOW_HOURS: i64 = 24;

/// The persisted subset of an unsafe verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub text_preview: String,
    pub category: Category,
    pub risk_score: f64,
    pub matched_terms: Vec<String>,
    /// A text signal (lexical or external) fired. Records written before
    /// this field existed were all text violations.
    #[serde(default = "default_true")]
    pub text_flagged: bool,
    #[serde(default)]
    pub image_flagged: bool,
}

fn default_true() -> bool {
    true
}

impl ViolationRecord {
    pub fn from_verdict(verdict: &FusedVerdict, user_id: &str) -> Self {
        Self {
            timestamp: verdict.timestamp,
            user_id: user_id.to_string(),
            text_preview: verdict.text_preview.clone(),
            category: verdict.category,
            risk_score: verdict.risk_score,
            matched_terms: verdict.lexical.matched_terms.clone(),
            text_flagged: verdict.lexical.is_restricted || verdict.external.fires(),
            image_flagged: verdict.image.as_ref().is_some_and(ExternalResult::fires),
        }
    }
}

/// Append-only sink plus a readable history.
#[async_trait]
pub trait ViolationStore: Send + Sync {
    /// Append one record. Concurrent appends must not interleave.
    async fn append(&self, record: &ViolationRecord) -> Result<()>;

    /// Every stored record, oldest first. A store that was never written
    /// to returns an empty history, not an error.
    async fn history(&self) -> Result<Vec<ViolationRecord>>;

    /// Human-readable location of the backing store (path, "memory", ...).
    fn location(&self) -> String;

    async fn total_count(&self) -> Result<usize> {
        Ok(self.history().await?.len())
    }

    /// Records with a timestamp within `window` of now.
    async fn count_since(&self, window: Duration) -> Result<usize> {
        let cutoff = Utc::now() - window;
        Ok(self
            .history()
            .await?
            .iter()
            .filter(|r| r.timestamp > cutoff)
            .count())
    }

    async fn statistics(&self) -> Result<ViolationStats> {
        let records = self.history().await?;
        Ok(ViolationStats::from_records(
            &records,
            Utc::now(),
            self.location(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    Active,
    NoViolationsYet,
}

/// Aggregate statistics over the violation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationStats {
    pub total_violations: usize,
    /// Violations in the last `RECENT_WINDOW_HOURS` hours.
    pub recent_violations: usize,
    /// Violations where a text signal fired.
    pub text_violations: usize,
    /// Violations where the image signal fired.
    pub image_violations: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub status: StoreStatus,
    pub location: String,
}

impl ViolationStats {
    pub fn from_records(records: &[ViolationRecord], now: DateTime<Utc>, location: String) -> Self {
        let cutoff = now - Duration::hours(RECENT_WINDOW_HOURS);
        let mut by_category = BTreeMap::new();
        for record in records {
            *by_category.entry(record.category).or_insert(0) += 1;
        }

        Self {
            total_violations: records.len(),
            recent_violations: records.iter().filter(|r| r.timestamp > cutoff).count(),
            text_violations: records.iter().filter(|r| r.text_flagged).count(),
            image_violations: records.iter().filter(|r| r.image_flagged).count(),
            by_category,
            status: if records.is_empty() {
                StoreStatus::NoViolationsYet
            } else {
                StoreStatus::Active
            },
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hours_ago: i64, category: Category, now: DateTime<Utc>) -> ViolationRecord {
        ViolationRecord {
            timestamp: now - Duration::hours(hours_ago),
            user_id: "u".into(),
            text_preview: "x".into(),
            category,
            risk_score: 0.6,
            matched_terms: vec![],
            text_flagged: true,
            image_flagged: false,
        }
    }

    #[test]
    fn test_stats_split_recent_and_category() {
        let now = Utc::now();
        let records = vec![
            record(1, Category::Violence, now),
            record(30, Category::Violence, now),
            record(2, Category::HateSpeech, now),
        ];
        let stats = ViolationStats::from_records(&records, now, "memory".into());

        assert_eq!(stats.total_violations, 3);
        assert_eq!(stats.recent_violations, 2);
        assert_eq!(stats.by_category[&Category::Violence], 2);
        assert_eq!(stats.by_category[&Category::HateSpeech], 1);
        assert_eq!(stats.status, StoreStatus::Active);
        assert_eq!(stats.text_violations, 3);
        assert_eq!(stats.image_violations, 0);
    }

    #[test]
    fn test_stats_split_text_and_image() {
        let now = Utc::now();
        let mut image_only = record(0, Category::Safe, now);
        image_only.text_flagged = false;
        image_only.image_flagged = true;
        let mut both = record(0, Category::Violence, now);
        both.image_flagged = true;

        let records = vec![record(0, Category::Violence, now), image_only, both];
        let stats = ViolationStats::from_records(&records, now, "memory".into());

        assert_eq!(stats.text_violations, 2);
        assert_eq!(stats.image_violations, 2);
    }

    #[test]
    fn test_record_without_signal_flags_reads_as_text() {
        let line = r#"{"timestamp":"2026-01-01T00:00:00Z","user_id":"u","text_preview":"x","category":"violence","risk_score":0.6,"matched_terms":["kill"]}"#;
        let record: ViolationRecord = serde_json::from_str(line).unwrap();
        assert!(record.text_flagged);
        assert!(!record.image_flagged);
    }

    #[test]
    fn test_empty_history_stats() {
        let stats = ViolationStats::from_records(&[], Utc::now(), "memory".into());
        assert_eq!(stats.total_violations, 0);
        assert_eq!(stats.status, StoreStatus::NoViolationsYet);
        assert!(stats.by_category.is_empty());
    }
}
