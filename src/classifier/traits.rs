// Signal source traits: the swap-ready abstraction for external classifiers.
//
// Unlike most fallible calls in this crate, classify() does not return a
// Result. Implementations catch every transport or protocol failure and
// report it as `available: false`, so callers can't accidentally treat an
// outage as a hard error or as "safe".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of one external classification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExternalResult {
    /// The classifier flagged the input. Only meaningful when `available`.
    pub has_signal: bool,
    /// False when the call failed, timed out, returned a non-success status,
    /// or was never attempted.
    pub available: bool,
}

impl ExternalResult {
    /// A successful call with the classifier's verdict.
    pub fn signal(has_signal: bool) -> Self {
        Self {
            has_signal,
            available: true,
        }
    }

    /// No external signal: the call failed or wasn't made.
    pub fn unavailable() -> Self {
        Self {
            has_signal: false,
            available: false,
        }
    }

    /// True only for an available, positive signal.
    pub fn fires(&self) -> bool {
        self.available && self.has_signal
    }
}

/// Trait for classifying text with an external service. Implementations
/// must be async because most providers require HTTP calls.
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Classify a single text. Must not panic or propagate transport errors.
    async fn classify(&self, text: &str) -> ExternalResult;
}

/// Trait for an optional image classifier. No built-in implementation
/// exists; hosts plug one in when they have a real model.
#[async_trait]
pub trait ImageSignalSource: Send + Sync {
    async fn classify_image(&self, image: &[u8]) -> ExternalResult;
}

/// Source used when no classifier is configured (e.g. no API key).
/// Always reports no external signal.
pub struct DisabledSource;

#[async_trait]
impl SignalSource for DisabledSource {
    async fn classify(&self, _text: &str) -> ExternalResult {
        ExternalResult::unavailable()
    }
}
