// Caller-side pacing for external classifier calls.
//
// The engine never sleeps between calls on its own. Callers that need to
// stay under a provider's quota (typically during term discovery, which
// fires one request per candidate) wrap their source in PacedSource.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use super::traits::{ExternalResult, SignalSource};

/// Enforces a minimum interval between acquisitions.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<RateLimiterInner>>,
}

struct RateLimiterInner {
    interval: Duration,
    last_request: Option<Instant>,
}

impl RateLimiter {
    /// Allow at most `requests_per_second` acquisitions per second.
    /// Non-positive (or NaN) rates disable pacing; rates too small to
    /// express as an interval saturate at `Duration::MAX`.
    pub fn new(requests_per_second: f64) -> Self {
        let interval = if requests_per_second > 0.0 {
            Duration::try_from_secs_f64(1.0 / requests_per_second).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self {
            inner: Arc::new(Mutex::new(RateLimiterInner {
                interval,
                last_request: None,
            })),
        }
    }

    /// Wait until the next request is allowed.
    pub async fn acquire(&self) {
        let mut inner = self.inner.lock().await;

        if let Some(last) = inner.last_request {
            let elapsed = last.elapsed();
            if elapsed < inner.interval {
                // Lock stays held across the sleep: concurrent callers are serialized.
                tokio::time::sleep(inner.interval - elapsed).await;
            }
        }

        inner.last_request = Some(Instant::now());
    }
}

/// A SignalSource that paces calls to the wrapped source.
pub struct PacedSource {
    source: Arc<dyn SignalSource>,
    limiter: RateLimiter,
}

impl PacedSource {
    pub fn new(source: Arc<dyn SignalSource>, requests_per_second: f64) -> Self {
        Self {
            source,
            limiter: RateLimiter::new(requests_per_second),
        }
    }
}

#[async_trait]
impl SignalSource for PacedSource {
    async fn classify(&self, text: &str) -> ExternalResult {
        self.limiter.acquire().await;
        self.source.classify(text).await
    }
}
