//! Bounded retry for collaborator calls
//!
//! Every external capability runs under a fixed-interval retry with a
//! per-attempt timeout and an overall deadline. Timeouts count as retryable
//! failures.

use crate::error::{CollaboratorError, ControllerError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed wait between attempts (no backoff)
    pub interval: Duration,
    /// Start-to-close timeout for a single attempt
    pub attempt_timeout: Duration,
    /// Schedule-to-close deadline across all attempts
    pub deadline: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            attempt_timeout: Duration::from_secs(20),
            deadline: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(interval: Duration, attempt_timeout: Duration, deadline: Duration) -> Self {
        Self {
            interval,
            attempt_timeout,
            deadline,
        }
    }
}

/// Why a retried call gave up
#[derive(Debug, Clone)]
pub struct RetryFailure {
    pub attempts: u32,
    pub last: CollaboratorError,
}

impl RetryFailure {
    /// Map to the session-ending error for `capability`
    pub fn into_controller_error(self, capability: &'static str) -> ControllerError {
        if self.last.is_retryable() {
            ControllerError::RetriesExhausted {
                capability,
                attempts: self.attempts,
                source: self.last,
            }
        } else {
            ControllerError::Collaborator {
                capability,
                source: self.last,
            }
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// deadline would pass before the next attempt could start.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    capability: &'static str,
    mut op: F,
) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollaboratorError>>,
{
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let remaining = policy.deadline.saturating_sub(started.elapsed());
        let budget = policy.attempt_timeout.min(remaining);

        let result = match tokio::time::timeout(budget, op()).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::timeout(budget)),
        };

        let error = match result {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let out_of_time = started.elapsed() + policy.interval >= policy.deadline;
        if !error.is_retryable() || out_of_time {
            tracing::warn!(
                capability,
                attempts,
                retryable = error.is_retryable(),
                error = %error,
                "Giving up on collaborator call"
            );
            return Err(RetryFailure {
                attempts,
                last: error,
            });
        }

        tracing::warn!(
            capability,
            attempt = attempts,
            delay_ms = policy.interval.as_millis() as u64,
            error = %error,
            "Collaborator call failed, retrying"
        );
        tokio::time::sleep(policy.interval).await;
    }
}
