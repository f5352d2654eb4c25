//! Retry with exponential back-off for remote calls

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::RetryConfig;
use crate::traits::ClientError;

/// Back-off policy for one kind of remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` retries transport errors until they succeed
    pub max_attempts: Option<u32>,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

/// Last error after the policy gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryFailure {
    pub attempts: u32,
    pub last_error: ClientError,
}

impl RetryPolicy {
    pub fn bounded(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            base_delay,
            max_delay,
        }
    }

    pub fn unbounded(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: None,
            base_delay,
            max_delay,
        }
    }

    /// Policy for gateway and bank submission
    pub fn dispatch(config: &RetryConfig) -> Self {
        Self::bounded(
            config.dispatch_max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Policy for the notification attempted while accepting a return
    pub fn inline_notification(config: &RetryConfig) -> Self {
        Self::bounded(
            config.inline_notification_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Policy for notification and confirmation
    pub fn idempotent(config: &RetryConfig) -> Self {
        Self::unbounded(
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    /// Delay before retry number `attempt` (1-based), doubling up to `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1).min(16));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `call` until it succeeds, is rejected or the attempts run out
    ///
    /// Only transport errors are retried; a rejection is returned at once.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, RetryFailure>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let mut attempt = 1;
        loop {
            let error = match call(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let exhausted = self.max_attempts.is_some_and(|max| attempt >= max);
            if !error.is_transient() || exhausted {
                return Err(RetryFailure {
                    attempts: attempt,
                    last_error: error,
                });
            }

            let delay = self.delay_for(attempt);
            match self.max_attempts {
                Some(max) => warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    operation, attempt, max, error, delay
                ),
                None => warn!(
                    "{} failed (attempt {}): {}; retrying in {:?}",
                    operation, attempt, error, delay
                ),
            }
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
