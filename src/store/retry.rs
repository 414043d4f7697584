use std::future::Future;
use std::time::Duration;

use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

use crate::error::StoreError;

/// Bounded retry for store calls
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// No retries at all
    pub fn none() -> Self {
        Self {
            attempts: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delays doubling from `initial_delay`, capped at `max_delay`
    fn delays(&self) -> impl Iterator<Item = Duration> {
        let initial_ms = self.initial_delay.as_millis() as u64;
        // ExponentialBackoff yields factor * 2^n for n = 1, 2, ...
        ExponentialBackoff::from_millis(2)
            .factor(initial_ms.div_ceil(2))
            .max_delay(self.max_delay)
            .take(self.attempts)
    }
}

/// Run a store call, retrying transient failures with backoff.
///
/// Non-transient errors and the error left after the last retry are returned
/// unchanged.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, action: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    RetryIf::start(policy.delays(), action, |e: &StoreError| {
        let retry = e.is_transient();
        if retry {
            tracing::warn!(operation = what, error = %e, "transient store error, retrying");
        }
        retry
    })
    .await
}
