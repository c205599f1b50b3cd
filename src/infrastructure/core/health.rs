//! Health tracking: a sliding 5-minute error window plus the last measured
//! latency, combined with circuit breaker state into one `HealthReport`.

use crate::domain::ports::HealthReport;
use crate::infrastructure::core::circuit_breaker::CircuitState;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const ERROR_WINDOW: Duration = Duration::from_secs(300);
const DEGRADED_ERROR_RATE: f64 = 0.10;

struct Sample {
    at: Instant,
    is_error: bool,
}

pub struct HealthTracker {
    samples: Mutex<VecDeque<Sample>>,
    last_latency: Mutex<Option<Duration>>,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self { samples: Mutex::new(VecDeque::new()), last_latency: Mutex::new(None) }
    }

    pub async fn record_success(&self, latency: Duration) {
        self.push_sample(false).await;
        *self.last_latency.lock().await = Some(latency);
    }

    pub async fn record_failure(&self, latency: Duration) {
        self.push_sample(true).await;
        *self.last_latency.lock().await = Some(latency);
    }

    async fn push_sample(&self, is_error: bool) {
        let mut samples = self.samples.lock().await;
        let now = Instant::now();
        samples.push_back(Sample { at: now, is_error });
        while let Some(front) = samples.front() {
            if now.duration_since(front.at) > ERROR_WINDOW {
                samples.pop_front();
            } else {
                break;
            }
        }
    }

    /// Fraction of samples in the trailing window that were errors.
    pub async fn error_rate(&self) -> f64 {
        let samples = self.samples.lock().await;
        if samples.is_empty() {
            return 0.0;
        }
        let errors = samples.iter().filter(|s| s.is_error).count();
        errors as f64 / samples.len() as f64
    }

    pub async fn last_latency(&self) -> Option<Duration> {
        *self.last_latency.lock().await
    }

    /// Derives a health report from breaker state plus the moving error
    /// rate: offline if the breaker is open, degraded if closed-but-noisy
    /// or half-open, healthy otherwise.
    pub async fn report(&self, breaker_state: CircuitState) -> HealthReport {
        match breaker_state {
            CircuitState::Open => HealthReport::Offline,
            CircuitState::HalfOpen => HealthReport::Degraded,
            CircuitState::Closed => {
                if self.error_rate().await > DEGRADED_ERROR_RATE {
                    HealthReport::Degraded
                } else {
                    HealthReport::Healthy
                }
            }
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn healthy_with_no_samples_and_closed_breaker() {
        let tracker = HealthTracker::new();
        assert_eq!(tracker.report(CircuitState::Closed).await, HealthReport::Healthy);
    }

    #[tokio::test]
    async fn degrades_when_error_rate_exceeds_ten_percent() {
        let tracker = HealthTracker::new();
        for _ in 0..9 {
            tracker.record_success(Duration::from_millis(10)).await;
        }
        tracker.record_failure(Duration::from_millis(10)).await;
        assert!(tracker.error_rate().await > 0.10 - f64::EPSILON);
        assert_eq!(tracker.report(CircuitState::Closed).await, HealthReport::Degraded);
    }

    #[tokio::test]
    async fn open_breaker_always_reports_offline() {
        let tracker = HealthTracker::new();
        tracker.record_success(Duration::from_millis(5)).await;
        assert_eq!(tracker.report(CircuitState::Open).await, HealthReport::Offline);
    }
}
