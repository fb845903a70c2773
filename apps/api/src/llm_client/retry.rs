//! Timeout + retry + exponential backoff around a single-attempt oracle.
//!
//! Each attempt races `CallPolicy::timeout`. A timeout only stops *waiting*:
//! the dropped future cancels our side of the HTTP exchange, but the upstream
//! model may keep generating. Under sustained timeout pressure that is wasted
//! upstream capacity we cannot reclaim.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::warn;

use super::{CompletionOracle, LlmError};

const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(1);
/// 1s, 2s, 4s, then flat.
const MAX_BACKOFF_DOUBLINGS: u32 = 2;

#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub timeout: Duration,
    /// Additional attempts after the first.
    pub max_retries: u32,
    pub base_backoff: Duration,
    /// Process-wide cap on attempts in flight, shared by every call site.
    /// A permit is held for one attempt only, never across backoff sleeps.
    pub limiter: Option<Arc<Semaphore>>,
}

impl CallPolicy {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
            base_backoff: DEFAULT_BASE_BACKOFF,
            limiter: None,
        }
    }

    pub fn with_limiter(mut self, limiter: Arc<Semaphore>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let doublings = retry.saturating_sub(1).min(MAX_BACKOFF_DOUBLINGS);
        self.base_backoff * (1 << doublings)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Calls the oracle under `policy`. Returns the raw response text, or the
/// error that ended the attempt sequence:
/// - a non-retryable error as-is, on the attempt it occurred
/// - `LlmError::RetriesExhausted` once every attempt failed transiently
pub async fn complete_with_retry(
    oracle: &dyn CompletionOracle,
    prompt: &str,
    system: &str,
    policy: &CallPolicy,
) -> Result<String, LlmError> {
    let mut last_error: Option<LlmError> = None;

    for attempt in 0..policy.max_attempts() {
        if attempt > 0 {
            let delay = policy.backoff_for(attempt);
            warn!(
                "Oracle attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        // Waiting for a permit is not part of the attempt's timeout.
        let _permit = match &policy.limiter {
            Some(limiter) => limiter.acquire().await.ok(),
            None => None,
        };

        match tokio::time::timeout(policy.timeout, oracle.complete(prompt, system)).await {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(e)) if e.is_retryable() => {
                warn!("Oracle attempt {} failed: {e}", attempt + 1);
                last_error = Some(e);
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                warn!(
                    "Oracle attempt {} timed out after {}ms",
                    attempt + 1,
                    policy.timeout.as_millis()
                );
                last_error = Some(LlmError::Timeout(policy.timeout));
            }
        }
    }

    Err(LlmError::RetriesExhausted {
        attempts: policy.max_attempts(),
        last: last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no attempt was made".to_string()),
    })
}
