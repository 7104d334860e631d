//! Bounded retry with exponential backoff.
//!
//! Broker failover shows up as a burst of transient faults on an otherwise
//! healthy topic. [`retry`] re-runs an operation through that window with
//! capped, jittered delays, and stops early on a non-retryable error or
//! when its [`CancellationToken`] fires.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Retry policy with exponential backoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt (0 = single attempt).
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Growth factor between consecutive delays.
    pub backoff_base: f64,
    /// Jitter factor in `[0.0, 1.0]`; 0 disables jitter.
    #[serde(default)]
    pub jitter_factor: f64,
}

impl RetryPolicy {
    /// Creates a new policy without jitter.
    #[must_use]
    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_base: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff_base,
            jitter_factor: 0.0,
        }
    }

    /// A policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_base: 2.0,
            jitter_factor: 0.0,
        }
    }

    /// Policy for riding out a broker failover.
    #[must_use]
    pub fn failover() -> Self {
        Self {
            max_retries: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_base: 2.0,
            jitter_factor: 0.1,
        }
    }

    /// Sets the jitter factor.
    #[must_use]
    pub const fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter_factor = factor;
        self
    }

    /// Delay before retry number `retry` (1-indexed; 0 yields zero).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_ms = self.initial_delay.as_millis() as f64 * self.backoff_base.powi(exponent);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);

        Duration::from_millis(capped_ms.max(0.0) as u64)
    }

    /// Delay with jitter applied. `random_factor` is clamped to `[0.0, 1.0]`.
    ///
    /// The result lies in `[delay * (1 - jitter), delay * (1 + jitter)]`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_with_jitter(&self, retry: u32, random_factor: f64) -> Duration {
        let base = self.delay_for_retry(retry);
        if self.jitter_factor <= 0.0 {
            return base;
        }

        let random_factor = random_factor.clamp(0.0, 1.0);
        let multiplier = 1.0 - self.jitter_factor + (2.0 * self.jitter_factor * random_factor);
        let jittered_ms = base.as_millis() as f64 * multiplier;

        Duration::from_millis(jittered_ms.max(0.0) as u64)
    }

    /// Returns true if another retry is allowed after `retries_done` retries.
    #[must_use]
    pub fn should_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// Total number of attempts this policy permits.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::failover()
    }
}

/// Result of a retried operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded.
    Success {
        /// Value returned by the successful attempt.
        value: T,
        /// Attempts made, including the successful one.
        attempts: u32,
    },
    /// The operation failed with a non-retryable error or ran out of retries.
    Exhausted {
        /// Error from the last attempt.
        error: E,
        /// Attempts made.
        attempts: u32,
    },
    /// The cancellation token fired before the operation settled.
    Aborted {
        /// Attempts made before cancellation.
        attempts: u32,
    },
}

impl<T, E> RetryOutcome<T, E> {
    /// Returns true if the operation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Number of attempts made.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Aborted { attempts } => *attempts,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, runs out of
/// retries or `cancel` fires.
///
/// `operation` receives the 0-indexed attempt number. `should_retry`
/// decides whether an error is transient.
pub async fn retry<T, E, Fut, F, P>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
    should_retry: P,
) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let mut retries: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return RetryOutcome::Aborted { attempts: retries };
        }

        let attempts = retries.saturating_add(1);
        // An attempt that settles wins over a cancellation raised meanwhile.
        let result = tokio::select! {
            biased;
            result = operation(retries) => result,
            () = cancel.cancelled() => return RetryOutcome::Aborted { attempts },
        };
        let error = match result {
            Ok(value) => return RetryOutcome::Success { value, attempts },
            Err(error) => error,
        };

        if !should_retry(&error) || !policy.should_retry(retries) {
            return RetryOutcome::Exhausted { error, attempts };
        }

        retries = attempts;
        let delay = policy.delay_with_jitter(retries, rand::random::<f64>());
        tokio::select! {
            biased;
            () = cancel.cancelled() => return RetryOutcome::Aborted { attempts },
            () = tokio::time::sleep(delay) => {},
        }
    }
}
