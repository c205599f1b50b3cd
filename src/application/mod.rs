//! Composition root (§2): the one place that owns every `Arc`-shared
//! service and wires the one-way event sink from adapters into the audit
//! journal. No service here holds a back-reference to its caller; tests
//! build a fresh `Application` per case rather than mutating process-global
//! state, mirroring this repository's own `application::system::Application`
//! split from `application::bootstrap`.

pub mod portfolio;
pub mod trading_engine;
pub mod venue_registry;

use crate::config::{ChainVenueConfig, Config, ExchangeVenueConfig, ReliabilityEnvConfig};
use crate::domain::audit::journal::AuditJournal;
use crate::domain::ports::{ChainVenue, EventSink, ExchangeVenue};
use crate::domain::security::SecurityManager;
use crate::infrastructure::chain::ethereum::EthereumChain;
use crate::infrastructure::core::http_client_factory::{HttpClient, ReqwestHttpClient};
use crate::infrastructure::core::reliability_envelope::{EnvelopeConfig, ReliabilityEnvelope};
use crate::infrastructure::exchange::bitfinex::BitfinexExchange;
use crate::infrastructure::observability::Metrics;
use anyhow::Result;
use portfolio::PortfolioAggregator;
use std::sync::Arc;
use trading_engine::TradingEngine;
use venue_registry::{RegisteredVenue, VenueRegistry};

/// A venue's order-book depth requested by the trading engine's scoring and
/// slippage-guard stages; not load-bearing for correctness, just a practical
/// cap on how much of the book adapters fetch per candidate.
const ORDER_BOOK_DEPTH: usize = 50;

fn envelope_config(reliability: &ReliabilityEnvConfig) -> EnvelopeConfig {
    EnvelopeConfig {
        requests_per_second: reliability.requests_per_second,
        burst_size: reliability.burst_size,
        rate_limit_max_wait: reliability.call_deadline,
        failure_threshold: reliability.failure_threshold,
        recovery_timeout: reliability.recovery_timeout,
        monitoring_period: reliability.monitoring_period,
        max_retries: reliability.max_retries,
        base_delay: reliability.base_delay,
        max_delay: reliability.max_delay,
        backoff_multiplier: reliability.backoff_multiplier,
    }
}

fn exchange_descriptor(cfg: &ExchangeVenueConfig) -> crate::domain::types::VenueDescriptor {
    use crate::domain::types::{Capability, VenueDescriptor, VenueKind};
    VenueDescriptor {
        id: cfg.venue_id.clone(),
        kind: VenueKind::Exchange,
        display_name: cfg.venue_id.clone(),
        capabilities: vec![Capability::BalanceQuery, Capability::LimitOrders],
    }
}

fn chain_descriptor(cfg: &ChainVenueConfig) -> crate::domain::types::VenueDescriptor {
    use crate::domain::types::{Capability, VenueDescriptor, VenueKind};
    VenueDescriptor {
        id: cfg.venue_id.clone(),
        kind: VenueKind::OnChain,
        display_name: cfg.venue_id.clone(),
        capabilities: vec![Capability::BalanceQuery, Capability::TransferTracking],
    }
}

/// Owns every shared service in the process: the audit journal, the
/// security manager, the venue registry, and the two application services
/// built over it (portfolio aggregator, trading engine).
pub struct Application {
    pub config: Config,
    pub audit: Arc<AuditJournal>,
    pub security: Arc<SecurityManager>,
    pub metrics: Metrics,
    pub registry: Arc<VenueRegistry>,
    pub portfolio: Arc<PortfolioAggregator>,
    pub trading_engine: Arc<TradingEngine>,
}

impl Application {
    /// Builds the full dependency graph from a loaded `Config`: audit
    /// journal first (every other service only ever writes to it through
    /// `EventSink`), then the venue adapters behind their reliability
    /// envelopes, then the venue registry, then the two services that read
    /// it (§2 dependency order: leaves first).
    pub async fn build(config: Config) -> Result<Self> {
        tracing::info!("building goldroute application (exchange={}, chain={})", config.exchange.venue_id, config.chain.venue_id);

        let audit: Arc<AuditJournal> = Arc::new(AuditJournal::new());
        let security = Arc::new(SecurityManager::new(audit.clone() as Arc<dyn EventSink>));
        let metrics = Metrics::new()?;

        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());

        let exchange_envelope = Arc::new(ReliabilityEnvelope::new(config.exchange.venue_id.clone(), envelope_config(&config.exchange.reliability)));
        let exchange: Arc<dyn ExchangeVenue> = Arc::new(BitfinexExchange::new(config.exchange.venue_id.clone(), config.exchange.base_url.clone(), http.clone(), exchange_envelope));

        let chain_envelope = ReliabilityEnvelope::new(config.chain.venue_id.clone(), envelope_config(&config.chain.reliability));
        let chain: Arc<dyn ChainVenue> = Arc::new(EthereumChain::new(
            config.chain.venue_id.clone(),
            config.chain.rpc_url.clone(),
            http,
            chain_envelope,
            config.chain.block_time_secs,
            config.chain.confirmation_threshold,
        ));

        let registry = Arc::new(VenueRegistry::new(vec![
            RegisteredVenue::exchange(exchange_descriptor(&config.exchange), exchange),
            RegisteredVenue::chain(chain_descriptor(&config.chain), chain, config.chain.watch_address.clone(), config.chain.token_contract.clone()),
        ]));

        let portfolio = Arc::new(PortfolioAggregator::new(
            registry.clone(),
            audit.clone() as Arc<dyn EventSink>,
            metrics.clone(),
            config.exchange.reliability.call_deadline.max(config.chain.reliability.call_deadline),
        ));

        let trading_engine = Arc::new(TradingEngine::new(registry.clone(), audit.clone() as Arc<dyn EventSink>, metrics.clone(), ORDER_BOOK_DEPTH, Vec::new()));

        Ok(Self { config, audit, security, metrics, registry, portfolio, trading_engine })
    }
}
