//! Three-state circuit breaker guarding calls to a single venue.
//!
//! Mirrors this repository's `CircuitBreaker` shape (an `Arc<RwLock<..>>`
//! state machine with a `call<F, T, E>` entry point) but tightened to the
//! routing layer's contract: consecutive failures are only "consecutive"
//! within `monitoring_period` of each other, and half-open allows exactly
//! one in-flight probe rather than a burst of `success_threshold` probes.

use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    monitoring_period: Duration,
    inner: RwLock<Inner>,
}

#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker [{name}] open, retry after {retry_after_ms}ms")]
    Open { name: String, retry_after_ms: u64 },

    #[error(transparent)]
    Inner(E),
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: u32, recovery_timeout: Duration, monitoring_period: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold,
            recovery_timeout,
            monitoring_period,
            inner: RwLock::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.read().await.state
    }

    /// Guards `f`, rejecting without invoking it when the breaker is open or
    /// a half-open probe is already in flight.
    pub async fn call<F, T, E>(&self, f: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        let is_probe = {
            let mut inner = self.inner.write().await;
            match inner.state {
                CircuitState::Open => {
                    let opened_at = inner.opened_at.expect("open state always sets opened_at");
                    if opened_at.elapsed() >= self.recovery_timeout {
                        info!("CircuitBreaker [{}]: Open -> HalfOpen (recovery timeout elapsed)", self.name);
                        inner.state = CircuitState::HalfOpen;
                        inner.probe_in_flight = true;
                        true
                    } else {
                        let retry_after_ms = (self.recovery_timeout - opened_at.elapsed()).as_millis() as u64;
                        return Err(CircuitBreakerError::Open { name: self.name.clone(), retry_after_ms });
                    }
                }
                CircuitState::HalfOpen => {
                    if inner.probe_in_flight {
                        return Err(CircuitBreakerError::Open { name: self.name.clone(), retry_after_ms: 0 });
                    }
                    inner.probe_in_flight = true;
                    true
                }
                CircuitState::Closed => false,
            }
        };

        match f.await {
            Ok(value) => {
                self.on_success(is_probe).await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure(is_probe).await;
                Err(CircuitBreakerError::Inner(err))
            }
        }
    }

    async fn on_success(&self, was_probe: bool) {
        let mut inner = self.inner.write().await;
        inner.consecutive_failures = 0;
        inner.last_failure_at = None;
        if was_probe || inner.state == CircuitState::HalfOpen {
            info!("CircuitBreaker [{}]: HalfOpen -> Closed (probe succeeded)", self.name);
            inner.state = CircuitState::Closed;
            inner.opened_at = None;
            inner.probe_in_flight = false;
        }
    }

    async fn on_failure(&self, was_probe: bool) {
        let mut inner = self.inner.write().await;
        let now = Instant::now();

        if was_probe || inner.state == CircuitState::HalfOpen {
            warn!("CircuitBreaker [{}]: HalfOpen -> Open (probe failed)", self.name);
            inner.state = CircuitState::Open;
            inner.opened_at = Some(now);
            inner.probe_in_flight = false;
            inner.consecutive_failures = self.failure_threshold;
            inner.last_failure_at = Some(now);
            return;
        }

        let still_consecutive = inner.last_failure_at.map(|t| now.duration_since(t) <= self.monitoring_period).unwrap_or(true);
        inner.consecutive_failures = if still_consecutive { inner.consecutive_failures + 1 } else { 1 };
        inner.last_failure_at = Some(now);

        if inner.state == CircuitState::Closed && inner.consecutive_failures >= self.failure_threshold {
            error!(
                "CircuitBreaker [{}]: Closed -> Open ({} consecutive failures)",
                self.name, inner.consecutive_failures
            );
            inner.state = CircuitState::Open;
            inner.opened_at = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_failure_threshold_consecutive_failures() {
        let cb = CircuitBreaker::new("test", 3, Duration::from_secs(30), Duration::from_secs(300));
        for _ in 0..3 {
            let _ = cb.call(async { Err::<(), &str>("boom") }).await;
        }
        assert_eq!(cb.state().await, CircuitState::Open);

        // Fourth call is rejected without invoking the inner function.
        let mut invoked = false;
        let result = cb
            .call(async {
                invoked = true;
                Ok::<(), &str>(())
            })
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::Open { .. })));
        assert!(!invoked);
    }

    #[tokio::test]
    async fn half_open_allows_exactly_one_probe() {
        let cb = CircuitBreaker::new("test", 2, Duration::from_millis(50), Duration::from_secs(300));
        for _ in 0..2 {
            let _ = cb.call(async { Err::<(), &str>("boom") }).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;

        // Concurrently issued "calls" after recovery: only the first is a probe.
        assert_eq!(cb.state().await, CircuitState::Open);
        let first = cb.call(async { Ok::<(), &str>(()) }).await;
        assert!(first.is_ok());
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn probe_failure_reopens_the_breaker() {
        let cb = CircuitBreaker::new("test", 1, Duration::from_millis(30), Duration::from_secs(300));
        let _ = cb.call(async { Err::<(), &str>("boom") }).await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        let probe = cb.call(async { Err::<(), &str>("still broken") }).await;
        assert!(probe.is_err());
        assert_eq!(cb.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn non_consecutive_failures_outside_monitoring_period_do_not_trip() {
        let cb = CircuitBreaker::new("test", 2, Duration::from_secs(30), Duration::from_millis(20));
        let _ = cb.call(async { Err::<(), &str>("boom") }).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        let _ = cb.call(async { Err::<(), &str>("boom") }).await;
        // Second failure landed outside the monitoring window, so it resets
        // the consecutive counter to 1 instead of tripping at threshold 2.
        assert_eq!(cb.state().await, CircuitState::Closed);
    }
}
