//! Per-venue environment configuration: reliability envelope tunables plus
//! the reference exchange/chain connection details.
//!
//! One process can register several venues; each venue's knobs are read
//! from a `<PREFIX>_*` family of variables so operators can run more than
//! one exchange credential set side by side.

use std::env;
use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Reliability envelope knobs shared by every venue kind.
#[derive(Debug, Clone)]
pub struct ReliabilityEnvConfig {
    pub requests_per_second: f64,
    pub burst_size: u32,
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub monitoring_period: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub call_deadline: Duration,
}

impl ReliabilityEnvConfig {
    pub fn from_env_with_prefix(prefix: &str) -> Self {
        Self {
            requests_per_second: env_or(&format!("{prefix}_REQUESTS_PER_SECOND"), 5.0),
            burst_size: env_or(&format!("{prefix}_BURST_SIZE"), 10),
            failure_threshold: env_or(&format!("{prefix}_FAILURE_THRESHOLD"), 5),
            recovery_timeout: Duration::from_millis(env_or(&format!("{prefix}_RECOVERY_TIMEOUT_MS"), 30_000)),
            monitoring_period: Duration::from_millis(env_or(&format!("{prefix}_MONITORING_PERIOD_MS"), 300_000)),
            max_retries: env_or(&format!("{prefix}_MAX_RETRIES"), 3),
            base_delay: Duration::from_millis(env_or(&format!("{prefix}_BASE_DELAY_MS"), 200)),
            max_delay: Duration::from_millis(env_or(&format!("{prefix}_MAX_DELAY_MS"), 5_000)),
            backoff_multiplier: env_or(&format!("{prefix}_BACKOFF_MULTIPLIER"), 2.0),
            call_deadline: Duration::from_millis(env_or(&format!("{prefix}_CALL_DEADLINE_MS"), 10_000)),
        }
    }
}

/// Reference exchange adapter configuration (Bitfinex-shaped).
#[derive(Debug, Clone)]
pub struct ExchangeVenueConfig {
    pub venue_id: String,
    pub base_url: String,
    /// Symbol the Portfolio Aggregator queries `getBalance` with.
    pub symbol: String,
    pub reliability: ReliabilityEnvConfig,
}

impl ExchangeVenueConfig {
    pub fn from_env() -> Self {
        Self {
            venue_id: env::var("EXCHANGE_VENUE_ID").unwrap_or_else(|_| "bitfinex".to_string()),
            base_url: env::var("EXCHANGE_BASE_URL").unwrap_or_else(|_| "https://api.bitfinex.com".to_string()),
            symbol: env::var("EXCHANGE_SYMBOL").unwrap_or_else(|_| "XAUT".to_string()),
            reliability: ReliabilityEnvConfig::from_env_with_prefix("EXCHANGE"),
        }
    }
}

/// Reference chain adapter configuration (Ethereum-shaped, ERC-20).
#[derive(Debug, Clone)]
pub struct ChainVenueConfig {
    pub venue_id: String,
    pub rpc_url: String,
    pub block_time_secs: u64,
    pub confirmation_threshold: u64,
    /// Address the Portfolio Aggregator watches; unset disables the chain
    /// venue's balance query without disabling its health check.
    pub watch_address: Option<String>,
    pub token_contract: Option<String>,
    pub reliability: ReliabilityEnvConfig,
}

impl ChainVenueConfig {
    pub fn from_env() -> Self {
        Self {
            venue_id: env::var("CHAIN_VENUE_ID").unwrap_or_else(|_| "ethereum".to_string()),
            rpc_url: env::var("CHAIN_RPC_URL").unwrap_or_else(|_| "https://eth.llamarpc.com".to_string()),
            block_time_secs: env_or("CHAIN_BLOCK_TIME_SECS", 12),
            confirmation_threshold: env_or("CHAIN_CONFIRMATION_THRESHOLD", 12),
            watch_address: env::var("CHAIN_WATCH_ADDRESS").ok().filter(|v| !v.is_empty()),
            token_contract: env::var("CHAIN_TOKEN_CONTRACT").ok().filter(|v| !v.is_empty()),
            reliability: ReliabilityEnvConfig::from_env_with_prefix("CHAIN"),
        }
    }
}
