//! API Front environment configuration: bind address, bearer tokens,
//! per-client rate limiting window, and the dev/prod error-detail profile.

use std::env;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct ApiEnvConfig {
    pub bind_address: String,
    pub port: u16,
    /// Bearer tokens accepted by the auth middleware.
    pub auth_tokens: Vec<String>,
    pub rate_limit_window_ms: u64,
    pub rate_limit_max_requests: u32,
    pub profile: Profile,
}

impl ApiEnvConfig {
    pub fn from_env() -> Self {
        let tokens = env::var("API_AUTH_TOKENS").unwrap_or_default();
        let auth_tokens = tokens
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>();

        let profile = match env::var("API_PROFILE").unwrap_or_else(|_| "production".to_string()).to_ascii_lowercase().as_str() {
            "development" | "dev" => Profile::Development,
            _ => Profile::Production,
        };

        Self {
            bind_address: env::var("API_BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("API_PORT", 8080),
            auth_tokens,
            rate_limit_window_ms: env_or("API_RATE_LIMIT_WINDOW_MS", 60_000),
            rate_limit_max_requests: env_or("API_RATE_LIMIT_MAX_REQUESTS", 120),
            profile,
        }
    }
}
