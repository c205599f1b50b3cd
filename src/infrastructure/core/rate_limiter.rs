//! Per-venue token-bucket rate limiter.
//!
//! Callers wait up to a bounded time for a token; if none becomes available
//! in time the call fails with a retryable `RATE_LIMIT_ERROR` rather than
//! blocking forever, the same posture this repository takes with its
//! `CircuitBreaker`'s bounded recovery wait.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

pub struct TokenBucketLimiter {
    requests_per_second: f64,
    burst_size: f64,
    max_wait: Duration,
    bucket: Mutex<Bucket>,
}

impl TokenBucketLimiter {
    pub fn new(requests_per_second: f64, burst_size: u32, max_wait: Duration) -> Self {
        Self {
            requests_per_second,
            burst_size: burst_size as f64,
            max_wait,
            bucket: Mutex::new(Bucket { tokens: burst_size as f64, last_refill: Instant::now() }),
        }
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.requests_per_second).min(self.burst_size);
        bucket.last_refill = now;
    }

    /// Waits for a token to become available, up to `max_wait`. Returns
    /// `false` if no token arrived in time.
    pub async fn acquire(&self) -> bool {
        let deadline = Instant::now() + self.max_wait;
        loop {
            {
                let mut bucket = self.bucket.lock().await;
                self.refill(&mut bucket);
                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return true;
                }
            }
            if Instant::now() >= deadline {
                return false;
            }
            let wait_for_one_token = Duration::from_secs_f64(1.0 / self.requests_per_second.max(0.001)).min(Duration::from_millis(50));
            tokio::time::sleep(wait_for_one_token).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn burst_is_consumed_immediately_then_throttles() {
        let limiter = TokenBucketLimiter::new(1000.0, 2, Duration::from_millis(500));
        assert!(limiter.acquire().await);
        assert!(limiter.acquire().await);
    }

    #[tokio::test]
    async fn exhausted_bucket_fails_after_bounded_wait() {
        let limiter = TokenBucketLimiter::new(1.0, 1, Duration::from_millis(30));
        assert!(limiter.acquire().await);
        assert!(!limiter.acquire().await);
    }

    #[tokio::test]
    async fn tokens_replenish_over_time() {
        let limiter = TokenBucketLimiter::new(50.0, 1, Duration::from_millis(200));
        assert!(limiter.acquire().await);
        assert!(limiter.acquire().await);
    }
}
