//! Bounded exponential-backoff retry for remote calls.
//!
//! Every remote call made by the engine goes through [`RetryPolicy::execute`].
//! The delay before retry `n` is `min(max_delay, base_delay * 2^(n-1))`, with
//! no jitter, so the default schedule is 250ms, 500ms, 1s, 2s.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use backon::{BlockingRetryable, ExponentialBuilder};
use mirror_notion::NotionError;
use tracing::warn;

use crate::error::SyncError;

/// First retry delay.
pub const BASE_DELAY: Duration = Duration::from_millis(250);

/// Upper bound for a single retry delay.
pub const MAX_DELAY: Duration = Duration::from_millis(2000);

/// Default number of attempts per remote call (the first try included).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

/// Retry configuration shared by all remote calls in a run.
#[derive(Clone)]
pub struct RetryPolicy {
    /// First retry delay.
    pub base_delay: Duration,
    /// Delay cap.
    pub max_delay: Duration,
    /// Attempts per call, the first try included.
    pub max_attempts: u32,
    sleeper: Sleeper,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: BASE_DELAY,
            max_delay: MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sleeper: Arc::new(std::thread::sleep),
        }
    }
}

impl RetryPolicy {
    /// Set the number of attempts per call (at least one).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Replace how the executor waits between attempts.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Retry without waiting. Meant for tests.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::default()
            .with_max_attempts(max_attempts)
            .with_sleeper(|_| {})
    }

    /// Delay applied after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.base_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_attempts.saturating_sub(1) as usize)
    }

    /// Run `operation`, retrying any failure until `max_attempts` is reached.
    ///
    /// `label` names the call in logs and in the final error.
    pub fn execute<T, F>(&self, label: &str, mut operation: F) -> Result<T, SyncError>
    where
        F: FnMut() -> Result<T, NotionError>,
    {
        let attempts = Cell::new(0u32);
        let sleeper = Arc::clone(&self.sleeper);

        let result = (|| {
            attempts.set(attempts.get() + 1);
            operation()
        })
        .retry(self.backoff())
        .sleep(move |delay| sleeper(delay))
        .notify(|err: &NotionError, delay: Duration| {
            let reason = if err.is_rate_limited() {
                "rate limited"
            } else {
                "failed"
            };
            warn!(
                "{} {} (attempt {}/{}), retrying in {:?}: {}",
                label,
                reason,
                attempts.get(),
                self.max_attempts,
                delay,
                err
            );
        })
        .call();

        result.map_err(|source| SyncError::RetriesExhausted {
            label: label.to_owned(),
            attempts: attempts.get(),
            source,
        })
    }
}
