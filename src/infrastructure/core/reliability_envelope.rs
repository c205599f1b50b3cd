//! Composes rate limiter, circuit breaker, retry, and health tracking
//! around a single venue's outbound calls (§9: composition, not
//! inheritance — every adapter holds one of these rather than subclassing
//! a base connector).

use crate::domain::errors::VenueError;
use crate::domain::ports::HealthReport;
use crate::infrastructure::core::circuit_breaker::{CircuitBreaker, CircuitBreakerError};
use crate::infrastructure::core::health::HealthTracker;
use crate::infrastructure::core::rate_limiter::TokenBucketLimiter;
use crate::infrastructure::core::retry::RetryPolicy;
use std::time::Duration;
use tokio::time::Instant;

pub struct ReliabilityEnvelope {
    venue_id: String,
    limiter: TokenBucketLimiter,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    health: HealthTracker,
}

pub struct EnvelopeConfig {
    pub requests_per_second: f64,
    pub burst_size: u32,
    pub rate_limit_max_wait: Duration,
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub monitoring_period: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl ReliabilityEnvelope {
    pub fn new(venue_id: impl Into<String>, cfg: EnvelopeConfig) -> Self {
        let venue_id = venue_id.into();
        Self {
            breaker: CircuitBreaker::new(venue_id.clone(), cfg.failure_threshold, cfg.recovery_timeout, cfg.monitoring_period),
            limiter: TokenBucketLimiter::new(cfg.requests_per_second, cfg.burst_size, cfg.rate_limit_max_wait),
            retry: RetryPolicy { max_retries: cfg.max_retries, base_delay: cfg.base_delay, max_delay: cfg.max_delay, multiplier: cfg.backoff_multiplier },
            health: HealthTracker::new(),
            venue_id,
        }
    }

    /// Routes one logical operation through rate limiting, the circuit
    /// breaker, and the retry policy, updating health on every attempt.
    pub async fn guard<F, Fut, T>(&self, mut op: F) -> Result<T, VenueError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, VenueError>>,
    {
        let mut attempt = 0;
        loop {
            if !self.limiter.acquire().await {
                return Err(VenueError::RateLimitError { venue_id: self.venue_id.clone() });
            }

            let start = Instant::now();
            let outcome = self.breaker.call(op()).await;
            let latency = start.elapsed();

            match outcome {
                Ok(value) => {
                    self.health.record_success(latency).await;
                    return Ok(value);
                }
                Err(CircuitBreakerError::Open { retry_after_ms, .. }) => {
                    return Err(VenueError::BreakerOpen { venue_id: self.venue_id.clone(), retry_after_ms });
                }
                Err(CircuitBreakerError::Inner(err)) => {
                    self.health.record_failure(latency).await;
                    if attempt >= self.retry.max_retries || !err.is_retryable() {
                        return Err(err);
                    }
                    tokio::time::sleep(self.retry.delay_for_attempt(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Unauthenticated/cheap calls (health checks) skip retry and the
    /// breaker's failure accounting but still observe the rate limiter and
    /// record a health sample.
    pub async fn probe<F, Fut, T>(&self, op: F) -> Result<T, VenueError>
    where
        Fut: std::future::Future<Output = Result<T, VenueError>>,
        F: FnOnce() -> Fut,
    {
        let start = Instant::now();
        let result = op().await;
        let latency = start.elapsed();
        match &result {
            Ok(_) => self.health.record_success(latency).await,
            Err(_) => self.health.record_failure(latency).await,
        }
        result
    }

    pub async fn health_report(&self) -> HealthReport {
        self.health.report(self.breaker.state().await).await
    }

    pub async fn error_rate(&self) -> f64 {
        self.health.error_rate().await
    }

    pub async fn last_latency(&self) -> Option<Duration> {
        self.health.last_latency().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_config() -> EnvelopeConfig {
        EnvelopeConfig {
            requests_per_second: 1000.0,
            burst_size: 100,
            rate_limit_max_wait: Duration::from_millis(50),
            failure_threshold: 3,
            recovery_timeout: Duration::from_millis(50),
            monitoring_period: Duration::from_secs(300),
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn retries_network_errors_and_eventually_succeeds() {
        let envelope = ReliabilityEnvelope::new("v1", test_config());
        let calls = AtomicU32::new(0);
        let result = envelope
            .guard(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(VenueError::NetworkError { venue_id: "v1".into(), reason: "timeout".into() })
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn breaker_trips_after_threshold_and_rejects_without_calling_op() {
        let envelope = ReliabilityEnvelope::new("v1", test_config());
        for _ in 0..3 {
            let _ = envelope.guard(|| async { Err::<(), _>(VenueError::NetworkError { venue_id: "v1".into(), reason: "down".into() }) }).await;
        }
        let invoked = AtomicU32::new(0);
        let result = envelope
            .guard(|| async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok::<(), VenueError>(())
            })
            .await;
        assert!(matches!(result, Err(VenueError::BreakerOpen { .. })));
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn validation_errors_are_never_retried() {
        let envelope = ReliabilityEnvelope::new("v1", test_config());
        let calls = AtomicU32::new(0);
        let result = envelope
            .guard(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(VenueError::ValidationError { reason: "bad address".into() })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
