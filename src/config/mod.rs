//! Configuration for the routing layer, organized by domain: the reference
//! exchange and chain venues, the API front, and observability.
//!
//! Each sub-config loads independently from environment variables and is
//! composed here into one immutable `Config`, matching this repository's
//! convention of a single `Config::from_env` entry point over per-domain
//! loaders. Updates are read-copy-update at the process level: there is no
//! live reload, but a new `Config` can always be built and swapped in by a
//! caller holding an `ArcSwap<Config>`.

mod api_config;
mod observability_config;
mod venue_config;

pub use api_config::{ApiEnvConfig, Profile};
pub use observability_config::ObservabilityEnvConfig;
pub use venue_config::{ChainVenueConfig, ExchangeVenueConfig, ReliabilityEnvConfig};

use anyhow::Result;

#[derive(Debug, Clone)]
pub struct Config {
    pub exchange: ExchangeVenueConfig,
    pub chain: ChainVenueConfig,
    pub api: ApiEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// documented defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            exchange: ExchangeVenueConfig::from_env(),
            chain: ChainVenueConfig::from_env(),
            api: ApiEnvConfig::from_env(),
            observability: ObservabilityEnvConfig::from_env(),
        })
    }
}
