use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::classifier::profanity::{DEFAULT_CLASSIFIER_URL, DEFAULT_TIMEOUT};

/// Runtime moderation policy. Shared by the engine and mutable through
/// `merge` while the process runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnginePolicy {
    /// Reported threshold for text decisions (informational; the
    /// score-threshold fusion mode cuts at the fixed 0.4 risk score).
    pub text_threshold: f64,
    /// Set `block_content` on unsafe verdicts.
    pub auto_block: bool,
    /// Append unsafe verdicts to the violation store.
    pub log_violations: bool,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            text_threshold: 0.5,
            auto_block: true,
            log_violations: true,
        }
    }
}

impl EnginePolicy {
    /// Merge a partial update. Recognized keys with the right JSON type
    /// overwrite the current value; everything else is ignored.
    ///
    /// Returns the keys that were applied. An update with no recognized keys
    /// is a no-op, not an error.
    pub fn merge(&mut self, updates: &Map<String, Value>) -> Vec<String> {
        let mut applied = Vec::new();

        for (key, value) in updates {
            let ok = match key.as_str() {
                "text_threshold" => value.as_f64().map(|v| self.text_threshold = v).is_some(),
                "auto_block" => value.as_bool().map(|v| self.auto_block = v).is_some(),
                "log_violations" => value.as_bool().map(|v| self.log_violations = v).is_some(),
                _ => continue,
            };

            if ok {
                applied.push(key.clone());
            } else {
                warn!(key = %key, value = %value, "Ignoring policy update with wrong value type");
            }
        }

        applied
    }
}

/// Central configuration loaded from environment variables.
///
/// Secrets come from env vars (never hardcoded). The .env file is loaded
/// automatically at startup via dotenvy.
pub struct Config {
    pub classifier_url: String,
    pub classifier_api_key: String,
    pub classifier_timeout: Duration,
    /// Optional term file; built-in defaults are used when unset or missing.
    pub terms_path: Option<PathBuf>,
    /// JSON-lines violation log.
    pub violation_log: PathBuf,
    /// SQLite violation database (takes precedence over the JSON-lines log).
    pub violation_db: Option<PathBuf>,
    pub policy: EnginePolicy,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Never fails: unset variables take their defaults, and malformed
    /// numeric or boolean values fall back to them with a warning.
    pub fn load() -> Self {
        let defaults = EnginePolicy::default();

        let classifier_timeout = env::var("SIEVE_CLASSIFIER_TIMEOUT_SECS")
            .ok()
            .and_then(|v| parse_or_warn::<u64>("SIEVE_CLASSIFIER_TIMEOUT_SECS", &v))
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let policy = EnginePolicy {
            text_threshold: env::var("SIEVE_TEXT_THRESHOLD")
                .ok()
                .and_then(|v| parse_or_warn("SIEVE_TEXT_THRESHOLD", &v))
                .unwrap_or(defaults.text_threshold),
            auto_block: env::var("SIEVE_AUTO_BLOCK")
                .ok()
                .and_then(|v| parse_or_warn("SIEVE_AUTO_BLOCK", &v))
                .unwrap_or(defaults.auto_block),
            log_violations: env::var("SIEVE_LOG_VIOLATIONS")
                .ok()
                .and_then(|v| parse_or_warn("SIEVE_LOG_VIOLATIONS", &v))
                .unwrap_or(defaults.log_violations),
        };

        Self {
            classifier_url: env::var("SIEVE_CLASSIFIER_URL")
                .unwrap_or_else(|_| DEFAULT_CLASSIFIER_URL.to_string()),
            classifier_api_key: env::var("SIEVE_CLASSIFIER_API_KEY").unwrap_or_default(),
            classifier_timeout,
            terms_path: env::var("SIEVE_TERMS_PATH").ok().map(PathBuf::from),
            violation_log: env::var("SIEVE_VIOLATION_LOG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./sieve-violations.jsonl")),
            violation_db: env::var("SIEVE_VIOLATION_DB").ok().map(PathBuf::from),
            policy,
        }
    }

    /// Whether an API key is available for the external classifier.
    pub fn has_classifier(&self) -> bool {
        !self.classifier_api_key.is_empty()
    }

    /// Check that the external classifier is configured.
    /// Call this before any operation that needs it to produce a signal.
    pub fn require_classifier(&self) -> Result<()> {
        if !self.has_classifier() {
            anyhow::bail!(
                "SIEVE_CLASSIFIER_API_KEY not set. Add it to your .env file\n\
                 to enable external classification and term discovery."
            );
        }
        Ok(())
    }
}

fn parse_or_warn<T: std::str::FromStr>(name: &str, raw: &str) -> Option<T> {
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = raw, "Unparseable config value, using default");
            None
        }
    }
}
