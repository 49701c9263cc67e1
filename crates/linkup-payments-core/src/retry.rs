//! Redelivery policy for side effects
//!
//! Notifications and emails that fail transiently are retried with doubling
//! backoff; rejections are given up on immediately.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Backoff policy for one delivery channel
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub retries: u32,
    /// Wait before the first retry
    pub initial_backoff: Duration,
    /// Upper bound on any single wait
    pub backoff_cap: Duration,
    /// Spread waits by up to a quarter
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            initial_backoff: Duration::from_millis(200),
            backoff_cap: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Retries after the first attempt
    #[must_use]
    pub fn with_max_attempts(self, retries: u32) -> Self {
        Self { retries, ..self }
    }

    #[must_use]
    pub fn with_base_delay(self, initial_backoff: Duration) -> Self {
        Self {
            initial_backoff,
            ..self
        }
    }

    #[must_use]
    pub fn with_max_delay(self, backoff_cap: Duration) -> Self {
        Self {
            backoff_cap,
            ..self
        }
    }

    #[must_use]
    pub fn with_jitter(self, jitter: bool) -> Self {
        Self { jitter, ..self }
    }

    /// Wait before retry `n` (0-based)
    #[must_use]
    pub fn backoff(&self, n: u32) -> Duration {
        let wait = 2u32
            .checked_pow(n)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .map_or(self.backoff_cap, |wait| wait.min(self.backoff_cap));

        let spread = wait.as_millis() as u64 / 4;
        if !self.jitter || spread == 0 {
            return wait;
        }
        let noise = (uuid::Uuid::new_v4().as_u128() % u128::from(spread)) as u64;
        wait + Duration::from_millis(noise)
    }
}

/// Errors that know whether redelivery can help
pub trait RetryableError {
    fn is_retryable(&self) -> bool;
}

/// Run `deliver` until it succeeds, fails permanently or the retries run out.
///
/// Returns the last result and how many attempts were made.
pub async fn retry_delivery<F, Fut, T, E>(policy: &RetryConfig, mut deliver: F) -> (Result<T, E>, u32)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    let mut attempts = 0;
    loop {
        attempts += 1;
        let err = match deliver().await {
            Ok(value) => return (Ok(value), attempts),
            Err(err) => err,
        };

        let retries_used = attempts - 1;
        if !err.is_retryable() || retries_used >= policy.retries {
            return (Err(err), attempts);
        }

        let wait = policy.backoff(retries_used);
        warn!(
            attempt = attempts,
            retries = policy.retries,
            wait_ms = wait.as_millis() as u64,
            error = %err,
            "Delivery failed, retrying"
        );
        tokio::time::sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[derive(Debug)]
    struct Flaky {
        transient: bool,
    }

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(if self.transient { "timeout" } else { "rejected" })
        }
    }

    impl RetryableError for Flaky {
        fn is_retryable(&self) -> bool {
            self.transient
        }
    }

    fn quick() -> RetryConfig {
        RetryConfig::new()
            .with_max_attempts(2)
            .with_base_delay(Duration::from_millis(1))
            .with_jitter(false)
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let policy = RetryConfig::new()
            .with_base_delay(Duration::from_millis(250))
            .with_max_delay(Duration::from_secs(2))
            .with_jitter(false);

        assert_eq!(policy.backoff(0), Duration::from_millis(250));
        assert_eq!(policy.backoff(2), Duration::from_secs(1));
        assert_eq!(policy.backoff(3), Duration::from_secs(2));
        assert_eq!(policy.backoff(64), Duration::from_secs(2));
    }

    #[test]
    fn test_jitter_bounded() {
        let policy = RetryConfig::new().with_base_delay(Duration::from_millis(800));
        for _ in 0..20 {
            let wait = policy.backoff(0);
            assert!(wait >= Duration::from_millis(800) && wait < Duration::from_millis(1000));
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = Cell::new(0);
        let (result, attempts) = retry_delivery(&quick(), || {
            calls.set(calls.get() + 1);
            let outcome = if calls.get() < 2 {
                Err(Flaky { transient: true })
            } else {
                Ok("sent")
            };
            async move { outcome }
        })
        .await;

        assert_eq!(result.unwrap(), "sent");
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn test_rejection_not_retried() {
        let (result, attempts) =
            retry_delivery(&quick(), || async { Err::<(), _>(Flaky { transient: false }) }).await;
        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let (result, attempts) =
            retry_delivery(&quick(), || async { Err::<(), _>(Flaky { transient: true }) }).await;
        assert!(result.is_err());
        assert_eq!(attempts, 3);
    }
}
