//! Cross-service end-to-end scenarios (S1-S6), exercised as black-box
//! integration tests over the public crate surface rather than against any
//! single module's internals.

use async_trait::async_trait;
use chrono::Utc;
use goldroute::application::portfolio::PortfolioAggregator;
use goldroute::application::venue_registry::{RegisteredVenue, VenueRegistry};
use goldroute::domain::audit::journal::AuditJournal;
use goldroute::domain::audit::record::{AuditDetails, AuditKind};
use goldroute::domain::errors::VenueError;
use goldroute::domain::ports::{ChainVenue, ConfirmationStatus, ExchangeVenue, HealthReport, VenueOrderStatus};
use goldroute::domain::security::credentials::Credentials;
use goldroute::domain::security::manager::SecurityManager;
use goldroute::domain::types::{Capability, Holding, PortfolioStatus, TransferObservation, VenueDescriptor, VenueKind};
use goldroute::infrastructure::core::circuit_breaker::{CircuitBreaker, CircuitState};
use goldroute::infrastructure::observability::Metrics;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

struct FixedExchange {
    id: &'static str,
    native: Decimal,
    health: HealthReport,
}

#[async_trait]
impl ExchangeVenue for FixedExchange {
    fn id(&self) -> &str {
        self.id
    }
    async fn authenticate(&self, _c: &Credentials) -> Result<(), VenueError> {
        Ok(())
    }
    async fn health_check(&self) -> HealthReport {
        self.health
    }
    async fn get_balance(&self, symbol: &str) -> Result<Holding, VenueError> {
        Ok(Holding::new(self.id, symbol, self.native, Utc::now()))
    }
    async fn get_order_book(&self, _s: &str, _d: usize) -> Result<goldroute::domain::order_book::OrderBook, VenueError> {
        Ok(goldroute::domain::order_book::OrderBook::default())
    }
    async fn place_limit_order(&self, _p: goldroute::domain::ports::PlaceOrderParams) -> Result<VenueOrderStatus, VenueError> {
        unimplemented!()
    }
    async fn cancel_order(&self, _id: &str) -> Result<(), VenueError> {
        Ok(())
    }
    async fn get_order_status(&self, _id: &str) -> Result<VenueOrderStatus, VenueError> {
        unimplemented!()
    }
}

struct FixedChain {
    id: &'static str,
    native: Decimal,
    health: HealthReport,
    fails: bool,
}

#[async_trait]
impl ChainVenue for FixedChain {
    fn id(&self) -> &str {
        self.id
    }
    async fn authenticate(&self, _c: &Credentials) -> Result<(), VenueError> {
        Ok(())
    }
    async fn health_check(&self) -> HealthReport {
        self.health
    }
    async fn get_balance(&self, _address: &str, token_contract: &str) -> Result<Holding, VenueError> {
        if self.fails {
            return Err(VenueError::NetworkError { venue_id: self.id.into(), reason: "rpc unreachable".into() });
        }
        Ok(Holding::new(self.id, token_contract, self.native, Utc::now()))
    }
    async fn track_transfers(&self, _a: &str, _t: &str) -> Result<Vec<TransferObservation>, VenueError> {
        Ok(vec![])
    }
    async fn get_confirmation_status(&self, _tx: &str) -> Result<ConfirmationStatus, VenueError> {
        unimplemented!()
    }
    async fn set_confirmation_threshold(&self, _n: u64) -> Result<(), VenueError> {
        Ok(())
    }
}

fn exchange_descriptor(id: &str) -> VenueDescriptor {
    VenueDescriptor { id: id.into(), kind: VenueKind::Exchange, display_name: id.into(), capabilities: vec![Capability::BalanceQuery, Capability::LimitOrders] }
}

fn chain_descriptor(id: &str) -> VenueDescriptor {
    VenueDescriptor { id: id.into(), kind: VenueKind::OnChain, display_name: id.into(), capabilities: vec![Capability::BalanceQuery, Capability::TransferTracking] }
}

/// S1: two venues, XAUt=2.5 and XAUt=0.75, total grams is their sum times
/// the troy-ounce-to-gram conversion constant.
#[tokio::test]
async fn s1_normalization_sums_across_venues() {
    let exchange = Arc::new(FixedExchange { id: "bitfinex", native: dec!(2.5), health: HealthReport::Healthy });
    let chain = Arc::new(FixedChain { id: "ethereum", native: dec!(0.75), health: HealthReport::Healthy, fails: false });

    let registry = Arc::new(VenueRegistry::new(vec![
        RegisteredVenue::exchange(exchange_descriptor("bitfinex"), exchange),
        RegisteredVenue::chain(chain_descriptor("ethereum"), chain, Some("0xabc".into()), Some("0xtoken".into())),
    ]));
    let audit = Arc::new(AuditJournal::new());
    let aggregator = PortfolioAggregator::new(registry, audit, Metrics::new().unwrap(), Duration::from_secs(5));

    let snapshot = aggregator.refresh().await;

    assert_eq!(snapshot.status, PortfolioStatus::Healthy);
    assert_eq!(snapshot.venues.len(), 2);
    let expected = (dec!(2.5) + dec!(0.75)) * dec!(31.1034768);
    assert_eq!(snapshot.total_grams, expected);
}

/// S3: breaker trips after 3 consecutive failures and fast-fails the next
/// call without invoking the guarded closure; after the recovery timeout
/// elapses exactly one probe is admitted.
#[tokio::test]
async fn s3_breaker_trips_and_then_probes_once() {
    let breaker = CircuitBreaker::new("venue-x", 3, Duration::from_millis(50), Duration::from_secs(300));

    for _ in 0..3 {
        let result: Result<(), _> = breaker.call(async { Err::<(), _>("boom") }).await;
        assert!(result.is_err());
    }
    assert_eq!(breaker.state().await, CircuitState::Open);

    let mut contacted_network = false;
    let fourth: Result<(), _> = breaker.call(async { contacted_network = true; Ok(()) }).await;
    assert!(fourth.is_err(), "breaker should reject without calling the venue");
    assert!(!contacted_network);

    tokio::time::sleep(Duration::from_millis(60)).await;
    let probe: Result<(), String> = breaker.call(async { Ok(()) }).await;
    assert!(probe.is_ok());
    assert_eq!(breaker.state().await, CircuitState::Closed);
}

/// S4: flipping one byte of a stored record's details breaks integrity from
/// that record forward, while records appended before the tamper were
/// already hashed in and remain internally consistent.
#[tokio::test]
async fn s4_tampering_breaks_the_chain() {
    let journal = AuditJournal::new();
    let mut details = serde_json::Map::new();
    details.insert("order".to_string(), serde_json::Value::String("o1".into()));
    journal.append(AuditKind::ApiRequest, AuditDetails::Generic(details.clone()), None, None);
    journal.append(AuditKind::OrderPlaced, AuditDetails::Generic(details.clone()), None, None);
    journal.append(AuditKind::OrderFilled, AuditDetails::Generic(details), None, None);
    assert!(journal.verify_integrity());

    // There is no public mutation API (the journal is append-only by
    // design); the tamper scenario is validated by the journal's own
    // in-module test since this is the only component that can reach the
    // backing store at all. Here we assert the contract that callers
    // outside the crate rely on: export is ordered and faithful to what
    // was appended.
    let exported = journal.export(None, None);
    assert_eq!(exported.len(), 3);
    assert_eq!(exported[0].seq, 1);
    assert_eq!(exported[2].seq, 3);
}

/// S5: credentials declaring a withdrawal permission are rejected outright,
/// nothing is stored, and a subsequent retrieve reports not-found.
#[tokio::test]
async fn s5_withdrawal_capable_credentials_are_rejected() {
    let audit = Arc::new(AuditJournal::new());
    let security = SecurityManager::new(audit.clone());

    let result = security
        .store_credentials(Credentials { venue_id: "bitfinex".into(), key: "k".into(), secret: "s".into(), permissions: vec!["trade".into(), "withdraw".into()] })
        .await;
    assert!(matches!(result, Err(VenueError::PermissionError { .. })));

    let retrieved = security.retrieve_credentials("bitfinex").await;
    assert!(matches!(retrieved, Err(VenueError::NotFound { .. })));

    let records = audit.export(None, None);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, AuditKind::CredStored);
    let rendered = serde_json::to_string(&records[0].details).unwrap();
    assert!(!rendered.contains("\"key\""));
    assert!(!rendered.contains("\"secret\""));
}

/// S6: two venues, one offline; snapshot status is degraded, the offline
/// venue is flagged unavailable and excluded from the total.
#[tokio::test]
async fn s6_portfolio_degraded_when_one_venue_is_offline() {
    let healthy = Arc::new(FixedExchange { id: "bitfinex", native: dec!(1), health: HealthReport::Healthy });
    let offline_chain = Arc::new(FixedChain { id: "ethereum", native: dec!(1), health: HealthReport::Offline, fails: true });

    let registry = Arc::new(VenueRegistry::new(vec![
        RegisteredVenue::exchange(exchange_descriptor("bitfinex"), healthy),
        RegisteredVenue::chain(chain_descriptor("ethereum"), offline_chain, Some("0xabc".into()), Some("0xtoken".into())),
    ]));
    let audit = Arc::new(AuditJournal::new());
    let aggregator = PortfolioAggregator::new(registry, audit, Metrics::new().unwrap(), Duration::from_secs(5));

    let snapshot = aggregator.refresh().await;

    assert_eq!(snapshot.status, PortfolioStatus::Degraded);
    let eth = snapshot.venues.iter().find(|v| v.venue_id == "ethereum").unwrap();
    assert!(!eth.available);
    let btfx = snapshot.venues.iter().find(|v| v.venue_id == "bitfinex").unwrap();
    assert!(btfx.available);
    assert_eq!(snapshot.total_grams, dec!(1) * dec!(31.1034768));
}
