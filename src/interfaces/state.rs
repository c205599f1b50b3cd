//! Shared state handed to every axum handler and middleware layer.

use crate::application::Application;
use crate::config::{ApiEnvConfig, Profile};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Sliding-window rate limiter keyed by client identity (§4.5). Each
/// identity gets its own deque of hit timestamps; a hit is allowed once the
/// deque's oldest entry has aged out of the window.
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    hits: parking_lot::Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self { window, max_requests, hits: parking_lot::Mutex::new(HashMap::new()) }
    }

    /// Records a hit for `identity` and returns whether it is within the
    /// window's budget.
    pub fn allow(&self, identity: &str) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock();
        let entry = hits.entry(identity.to_string()).or_default();
        while let Some(&front) = entry.front() {
            if now.duration_since(front) > self.window {
                entry.pop_front();
            } else {
                break;
            }
        }
        if entry.len() as u32 >= self.max_requests {
            false
        } else {
            entry.push_back(now);
            true
        }
    }

    /// Wall-clock time at which the oldest hit for `identity` ages out.
    pub fn reset_at(&self, identity: &str) -> DateTime<Utc> {
        let hits = self.hits.lock();
        match hits.get(identity).and_then(|q| q.front()) {
            Some(&oldest) => {
                let remaining = self.window.saturating_sub(Instant::now().duration_since(oldest));
                Utc::now() + chrono::Duration::from_std(remaining).unwrap_or_default()
            }
            None => Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub app: Arc<Application>,
    pub auth_tokens: Arc<HashSet<String>>,
    pub profile: Profile,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(app: Arc<Application>) -> Self {
        let api: &ApiEnvConfig = &app.config.api;
        let auth_tokens = Arc::new(api.auth_tokens.iter().cloned().collect::<HashSet<_>>());
        let rate_limiter = Arc::new(RateLimiter::new(Duration::from_millis(api.rate_limit_window_ms), api.rate_limit_max_requests));
        let profile = api.profile;
        Self { app, auth_tokens, profile, rate_limiter }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_configured_budget_then_blocks() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 2);
        assert!(limiter.allow("a"));
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
    }
}
