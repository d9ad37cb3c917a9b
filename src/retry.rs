//! Retry with exponential backoff for provider network calls.
//!
//! Every outbound provider operation (inbox creation and message fetching) runs
//! through a [`RetryPolicy`]. The policy retries transient failures — as classified
//! by [`Error::is_retryable`](crate::Error::is_retryable) — sleeping
//! `min(base * 2^attempt, max)` between attempts, and surfaces the last classified
//! failure once attempts are exhausted. It knows nothing about email semantics.
//!
//! # Example
//!
//! ```
//! use temp_inbox::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.delay_for(0), Duration::from_secs(1));
//! assert_eq!(policy.delay_for(2), Duration::from_secs(4));
//! ```

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Exponential backoff policy: up to `max_retries + 1` attempts with capped delays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles each attempt.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with explicit limits.
    #[must_use]
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    /// Computes the backoff delay for a zero-based attempt number.
    ///
    /// `delay = min(base * 2^attempt, max)`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay.as_secs_f64() * 2f64.powi(attempt.min(63) as i32);
        Duration::from_secs_f64(exponential.min(self.max_delay.as_secs_f64()))
    }

    /// Executes `op` with retry and exponential backoff.
    ///
    /// The operation is re-invoked from scratch on each attempt, so it must be
    /// safe to repeat (provider create/list calls are). Non-retryable errors are
    /// returned immediately; retryable ones are returned after the final attempt.
    ///
    /// # Errors
    ///
    /// Returns the last classified failure once attempts are exhausted.
    pub async fn run<T, Fut, F>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Operation failed, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Returns a copy of this policy with every delay capped at `cap`.
    ///
    /// Used for fetches that run while the session lock is held, so backoff
    /// sleeps never starve concurrent session access for longer than one
    /// polling interval per attempt.
    #[must_use]
    pub fn with_delay_cap(&self, cap: Duration) -> Self {
        Self {
            max_retries: self.max_retries,
            base_delay: self.base_delay.min(cap),
            max_delay: self.max_delay.min(cap),
        }
    }

    /// Decides whether a failed attempt should be retried.
    ///
    /// Returns the backoff delay to sleep before the next attempt, or `None`
    /// when the error is not retryable or attempts are exhausted. Used by call
    /// sites that cannot re-create their operation from an owned closure (e.g.
    /// retrying over a provider handle borrowed from the live session).
    #[must_use]
    pub fn next_delay(&self, error: &crate::Error, attempt: u32) -> Option<Duration> {
        if error.is_retryable() && attempt < self.max_retries {
            Some(self.delay_for(attempt))
        } else {
            None
        }
    }
}
