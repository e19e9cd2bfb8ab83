//! Bounded exponential-backoff retry for transient API failures.
//!
//! Rate limiting is handled inline by the requester because the server says
//! exactly how long to wait. Everything else that may heal on its own
//! (connection failures, 5xx) goes through a [`RetryPolicy`], which is plain
//! data so callers and tests can swap it.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use crate::error::{Error, Result, short_error_message};

/// Default number of attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Default shortest wait between attempts.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_secs(15);

/// Default longest wait between attempts.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Default multiplier applied to the wait after each failure.
pub const DEFAULT_FACTOR: f32 = 2.0;

/// Configuration for retry operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Wait before the first retry.
    pub min_delay: Duration,
    /// Upper bound for any single wait.
    pub max_delay: Duration,
    /// Growth factor between consecutive waits.
    pub factor: f32,
    /// Decides whether an error is worth another attempt.
    pub retry_on: fn(&Error) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_delay: DEFAULT_MIN_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            factor: DEFAULT_FACTOR,
            retry_on: Error::is_transient,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with custom bounds and the default predicate.
    #[must_use]
    pub fn new(max_attempts: usize, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            min_delay,
            max_delay,
            ..Self::default()
        }
    }

    /// A policy that makes exactly one attempt.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Replace the retryable-error predicate.
    #[must_use]
    pub fn with_predicate(mut self, retry_on: fn(&Error) -> bool) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Set the growth factor.
    #[must_use]
    pub fn with_factor(mut self, factor: f32) -> Self {
        self.factor = factor;
        self
    }

    /// Build the exponential backoff strategy for this policy.
    ///
    /// No jitter: the waits are deterministic so pacing stays predictable
    /// against a server that already throttles.
    #[must_use]
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.factor)
            .with_max_times(self.max_attempts.saturating_sub(1))
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// runs out of attempts. The last error is returned on exhaustion.
    ///
    /// `what` names the operation in log lines.
    pub async fn run<T, F, Fut>(&self, what: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempt = AtomicU32::new(0);
        let retry_on = self.retry_on;

        let retry_op = || {
            attempt.fetch_add(1, Ordering::SeqCst);
            operation()
        };

        retry_op
            .retry(self.backoff())
            .sleep(tokio::time::sleep)
            .when(move |err: &Error| retry_on(err))
            .notify(|err: &Error, dur: Duration| {
                tracing::warn!(
                    target_name = what,
                    attempt = attempt.load(Ordering::SeqCst),
                    max_attempts = self.max_attempts,
                    retry_in = ?dur,
                    error = %short_error_message(err),
                    "Request failed, backing off"
                );
            })
            .await
    }
}
