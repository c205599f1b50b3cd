//! Exponential-backoff retry policy, gated on `Retryable` classification.
//!
//! `delay = min(base_delay * multiplier^attempt, max_delay)`. Only errors
//! classified retryable by `domain::errors::Retryable` are re-attempted;
//! auth, validation, and permission failures short-circuit immediately.

use crate::domain::errors::Retryable;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl RetryPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(scaled).min(self.max_delay)
    }

    /// Runs `op` up to `max_retries + 1` total attempts. Stops immediately
    /// on a non-retryable error. Returns the final error (with the retry
    /// count attached by the caller) if every attempt fails.
    pub async fn run<F, Fut, T, E>(&self, mut op: F) -> (Result<T, E>, u32)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: Retryable,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return (Ok(value), attempt),
                Err(err) => {
                    if attempt >= self.max_retries || !err.is_retryable() {
                        return (Err(err), attempt);
                    }
                    tokio::time::sleep(self.delay_for_attempt(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Flaky(bool);
    impl Retryable for Flaky {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn delay_grows_exponentially_and_caps_at_max() {
        let policy = RetryPolicy { max_retries: 5, base_delay: Duration::from_millis(100), max_delay: Duration::from_secs(2), multiplier: 2.0 };
        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let policy = RetryPolicy { max_retries: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5), multiplier: 2.0 };
        let calls = AtomicU32::new(0);
        let (result, attempts) = policy
            .run(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 { Err(Flaky(true)) } else { Ok(42) }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn never_retries_non_retryable_errors() {
        let policy = RetryPolicy { max_retries: 3, base_delay: Duration::from_millis(1), max_delay: Duration::from_millis(5), multiplier: 2.0 };
        let calls = AtomicU32::new(0);
        let (result, attempts) = policy
            .run(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Flaky(false))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(attempts, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
