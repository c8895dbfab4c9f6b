// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// HTTP status codes considered transient.
const RETRYABLE_STATUS_CODES: &[u16] = &[408, 429, 500, 502, 503, 504];

/// Whether an HTTP status code warrants a retry.
pub fn is_retryable_status(code: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&code)
}

/// Error classification hook for [`retry_with_policy`].
///
/// `retry_after` reports a server-mandated delay (the `Retry-After` header on
/// a 429) which takes precedence over the computed backoff.
pub trait RetryableError {
    fn is_retryable(&self) -> bool;

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Backoff before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any computed backoff.
    pub max_backoff: Duration,
    /// Exponential multiplier between attempts.
    pub backoff_multiplier: f64,
    /// Jitter fraction (0.0-1.0) applied to the computed backoff.
    pub jitter_factor: f64,
    /// Whether jitter is applied at all.
    pub enable_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            enable_jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Standard policy for page fetches.
    pub fn standard() -> Self {
        Self::default()
    }

    /// Shorter backoff for cheap probes (robots.txt, HEAD requests).
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            enable_jitter: true,
        }
    }

    /// Compute the backoff before attempt `attempt + 1`.
    ///
    /// `attempt` is 1-based: `calculate_backoff(1)` is the delay after the
    /// first failure.
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let backoff_secs = self.initial_backoff.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

        let capped = backoff_secs.min(self.max_backoff.as_secs_f64());

        let final_backoff = if self.enable_jitter && self.jitter_factor > 0.0 {
            let jitter_range = capped * self.jitter_factor;
            let jitter = rand::random_range(-jitter_range..=jitter_range);
            (capped + jitter).max(0.0)
        } else {
            capped
        };

        Duration::from_secs_f64(final_backoff)
    }

    /// Whether another attempt is allowed after `attempt` attempts.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Run `operation` with up to `policy.max_attempts` attempts.
///
/// Retries only errors whose [`RetryableError::is_retryable`] returns true;
/// anything else propagates on first occurrence. A server-supplied
/// `retry_after` overrides the computed backoff. When attempts are exhausted
/// the last error is returned to the caller.
pub async fn retry_with_policy<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || !policy.should_retry(attempt) {
                    return Err(err);
                }
                let delay = err
                    .retry_after()
                    .unwrap_or_else(|| policy.calculate_backoff(attempt));
                debug!(attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying after transient error");
                sleep(delay).await;
            }
        }
    }
}
