//! Portfolio Aggregator (§4.2): fans a balance query out to every
//! registered, non-disabled venue concurrently and normalizes the result
//! into a single gram-denominated snapshot.
//!
//! The "latest" snapshot is a read-copy-update cell: refreshes build a new
//! `Arc<PortfolioSnapshot>` and swap it in under a write lock; readers clone
//! the `Arc` under a read lock and never block a concurrent refresh,
//! matching this repository's `RwLock<Arc<_>>` snapshot convention.

use crate::application::venue_registry::{VenueHandle, VenueRegistry};
use crate::domain::audit::record::AuditDetails;
use crate::domain::audit::record::AuditKind;
use crate::domain::ports::{EventSink, HealthReport};
use crate::domain::types::{PortfolioSnapshot, PortfolioStatus, VenueHoldings, is_known_symbol};
use crate::infrastructure::observability::Metrics;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

struct VenueQueryOutcome {
    holdings: VenueHoldings,
    health: HealthReport,
}

fn health_label(health: HealthReport) -> &'static str {
    match health {
        HealthReport::Healthy => "healthy",
        HealthReport::Degraded => "degraded",
        HealthReport::Offline => "offline",
    }
}

pub struct PortfolioAggregator {
    registry: Arc<VenueRegistry>,
    sink: Arc<dyn EventSink>,
    metrics: Metrics,
    call_deadline: Duration,
    snapshot: RwLock<Arc<PortfolioSnapshot>>,
    last_health: Mutex<HashMap<String, HealthReport>>,
}

fn empty_snapshot() -> Arc<PortfolioSnapshot> {
    Arc::new(PortfolioSnapshot { total_grams: Decimal::ZERO, venues: Vec::new(), status: PortfolioStatus::Healthy, built_at: Utc::now(), unrecognized_symbols: Vec::new() })
}

impl PortfolioAggregator {
    pub fn new(registry: Arc<VenueRegistry>, sink: Arc<dyn EventSink>, metrics: Metrics, call_deadline: Duration) -> Self {
        Self { registry, sink, metrics, call_deadline, snapshot: RwLock::new(empty_snapshot()), last_health: Mutex::new(HashMap::new()) }
    }

    /// Returns the latest cached snapshot without triggering I/O.
    pub async fn latest(&self) -> Arc<PortfolioSnapshot> {
        self.snapshot.read().await.clone()
    }

    async fn query_one(&self, venue_id: &str, handle: &VenueHandle, disabled: bool, prev_last_seen: Option<DateTime<Utc>>) -> VenueQueryOutcome {
        if disabled {
            return VenueQueryOutcome {
                holdings: VenueHoldings { venue_id: venue_id.to_string(), holdings: Vec::new(), available: false, last_seen: prev_last_seen },
                health: HealthReport::Offline,
            };
        }

        match handle {
            VenueHandle::Exchange(venue) => {
                let health = venue.health_check().await;
                let result = tokio::time::timeout(self.call_deadline, venue.get_balance("XAUT")).await;
                match result {
                    Ok(Ok(holding)) => VenueQueryOutcome {
                        holdings: VenueHoldings { venue_id: venue_id.to_string(), holdings: vec![holding], available: true, last_seen: Some(Utc::now()) },
                        health,
                    },
                    _ => VenueQueryOutcome {
                        holdings: VenueHoldings { venue_id: venue_id.to_string(), holdings: Vec::new(), available: false, last_seen: prev_last_seen },
                        health,
                    },
                }
            }
            VenueHandle::Chain { venue, watch_address, token_contract } => {
                let health = venue.health_check().await;
                let (Some(address), Some(token)) = (watch_address.as_deref(), token_contract.as_deref()) else {
                    return VenueQueryOutcome {
                        holdings: VenueHoldings { venue_id: venue_id.to_string(), holdings: Vec::new(), available: false, last_seen: prev_last_seen },
                        health,
                    };
                };
                let result = tokio::time::timeout(self.call_deadline, venue.get_balance(address, token)).await;
                match result {
                    Ok(Ok(holding)) => VenueQueryOutcome {
                        holdings: VenueHoldings { venue_id: venue_id.to_string(), holdings: vec![holding], available: true, last_seen: Some(Utc::now()) },
                        health,
                    },
                    _ => VenueQueryOutcome {
                        holdings: VenueHoldings { venue_id: venue_id.to_string(), holdings: Vec::new(), available: false, last_seen: prev_last_seen },
                        health,
                    },
                }
            }
        }
    }

    /// Fans out a balance query to every registered venue and swaps in a
    /// freshly built snapshot.
    pub async fn refresh(&self) -> Arc<PortfolioSnapshot> {
        let previous = self.latest().await;
        let previous_last_seen: HashMap<&str, Option<DateTime<Utc>>> = previous.venues.iter().map(|v| (v.venue_id.as_str(), v.last_seen)).collect();

        let queries = self.registry.iter().map(|registered| {
            let prev = previous_last_seen.get(registered.descriptor.id.as_str()).copied().flatten();
            self.query_one(&registered.descriptor.id, &registered.handle, registered.is_disabled(), prev)
        });
        let outcomes: Vec<VenueQueryOutcome> = futures::future::join_all(queries).await;

        let mut total_grams = Decimal::ZERO;
        let mut unrecognized_symbols = Vec::new();
        let mut venues = Vec::with_capacity(outcomes.len());
        let any_registered = !outcomes.is_empty();
        let mut all_available = true;
        let mut none_available = true;
        let mut all_healthy = true;

        for outcome in outcomes {
            if outcome.holdings.available {
                none_available = false;
                for holding in &outcome.holdings.holdings {
                    total_grams += holding.grams;
                    if !is_known_symbol(&holding.symbol) {
                        unrecognized_symbols.push(holding.symbol.clone());
                    }
                }
            } else {
                all_available = false;
            }
            if outcome.health != HealthReport::Healthy {
                all_healthy = false;
            }
            self.metrics.set_venue_health(&outcome.holdings.venue_id, health_gauge_value(outcome.health));
            self.note_health_change(&outcome.holdings.venue_id, outcome.health).await;
            venues.push(outcome.holdings);
        }

        let status = if !any_registered {
            PortfolioStatus::Healthy
        } else if none_available {
            PortfolioStatus::Offline
        } else if all_available && all_healthy {
            PortfolioStatus::Healthy
        } else {
            PortfolioStatus::Degraded
        };

        let snapshot = Arc::new(PortfolioSnapshot { total_grams, venues, status, built_at: Utc::now(), unrecognized_symbols });
        self.metrics.portfolio_total_grams.set(total_grams.to_f64().unwrap_or(0.0));
        *self.snapshot.write().await = snapshot.clone();
        snapshot
    }

    /// Emits a `HEALTH_CHANGE` audit record the first time a venue's health
    /// is observed, and again whenever it differs from the prior poll.
    async fn note_health_change(&self, venue_id: &str, health: HealthReport) {
        let mut last = self.last_health.lock().await;
        let previous = last.insert(venue_id.to_string(), health);
        if previous.is_some_and(|p| p == health) {
            return;
        }
        let previous_label = previous.map(health_label).unwrap_or("unknown").to_string();
        self.sink
            .record(
                AuditKind::HealthChange,
                AuditDetails::HealthChangeEvent { venue_id: venue_id.to_string(), previous: previous_label, current: health_label(health).to_string() },
                None,
                Some(venue_id.to_string()),
            )
            .await;
    }
}

fn health_gauge_value(health: HealthReport) -> f64 {
    match health {
        HealthReport::Healthy => 1.0,
        HealthReport::Degraded => 0.5,
        HealthReport::Offline => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::venue_registry::RegisteredVenue;
    use crate::domain::audit::journal::AuditJournal;
    use crate::domain::errors::VenueError;
    use crate::domain::ports::{ChainVenue, ConfirmationStatus, ExchangeVenue, PlaceOrderParams, VenueOrderStatus};
    use crate::domain::security::Credentials;
    use crate::domain::types::{Capability, Holding, TransferObservation, VenueDescriptor, VenueKind};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

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
        async fn get_order_book(&self, _s: &str, _d: usize) -> Result<crate::domain::order_book::OrderBook, VenueError> {
            unimplemented!()
        }
        async fn place_limit_order(&self, _p: PlaceOrderParams) -> Result<VenueOrderStatus, VenueError> {
            unimplemented!()
        }
        async fn cancel_order(&self, _id: &str) -> Result<(), VenueError> {
            Ok(())
        }
        async fn get_order_status(&self, _id: &str) -> Result<VenueOrderStatus, VenueError> {
            unimplemented!()
        }
    }

    struct OfflineExchange;
    #[async_trait]
    impl ExchangeVenue for OfflineExchange {
        fn id(&self) -> &str {
            "offline"
        }
        async fn authenticate(&self, _c: &Credentials) -> Result<(), VenueError> {
            Ok(())
        }
        async fn health_check(&self) -> HealthReport {
            HealthReport::Offline
        }
        async fn get_balance(&self, _symbol: &str) -> Result<Holding, VenueError> {
            Err(VenueError::NetworkError { venue_id: "offline".into(), reason: "down".into() })
        }
        async fn get_order_book(&self, _s: &str, _d: usize) -> Result<crate::domain::order_book::OrderBook, VenueError> {
            unimplemented!()
        }
        async fn place_limit_order(&self, _p: PlaceOrderParams) -> Result<VenueOrderStatus, VenueError> {
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
        native: Decimal,
    }
    #[async_trait]
    impl ChainVenue for FixedChain {
        fn id(&self) -> &str {
            "ethereum"
        }
        async fn authenticate(&self, _c: &Credentials) -> Result<(), VenueError> {
            Ok(())
        }
        async fn health_check(&self) -> HealthReport {
            HealthReport::Healthy
        }
        async fn get_balance(&self, _address: &str, _token: &str) -> Result<Holding, VenueError> {
            Ok(Holding::new("ethereum", "XAUT", self.native, Utc::now()))
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

    fn descriptor(id: &str, kind: VenueKind) -> VenueDescriptor {
        VenueDescriptor { id: id.into(), kind, display_name: id.into(), capabilities: vec![Capability::BalanceQuery] }
    }

    #[tokio::test]
    async fn s1_normalization_sums_grams_across_two_venues() {
        let registry = Arc::new(VenueRegistry::new(vec![
            RegisteredVenue::exchange(descriptor("a", VenueKind::Exchange), Arc::new(FixedExchange { id: "a", native: dec!(2.5), health: HealthReport::Healthy })),
            RegisteredVenue::chain(descriptor("b", VenueKind::OnChain), Arc::new(FixedChain { native: dec!(0.75) }), Some("0xabc".into()), Some("0xdef".into())),
        ]));
        let aggregator = PortfolioAggregator::new(registry, Arc::new(AuditJournal::new()), Metrics::new().unwrap(), Duration::from_secs(5));
        let snapshot = aggregator.refresh().await;
        assert_eq!(snapshot.status, PortfolioStatus::Healthy);
        assert_eq!(snapshot.total_grams, dec!(3.25) * crate::domain::types::TROY_OUNCE_TO_GRAM);
        assert_eq!(snapshot.venues.len(), 2);
    }

    #[tokio::test]
    async fn s6_one_offline_venue_degrades_overall_status() {
        let registry = Arc::new(VenueRegistry::new(vec![
            RegisteredVenue::exchange(descriptor("a", VenueKind::Exchange), Arc::new(FixedExchange { id: "a", native: dec!(1), health: HealthReport::Healthy })),
            RegisteredVenue::exchange(descriptor("offline", VenueKind::Exchange), Arc::new(OfflineExchange)),
        ]));
        let aggregator = PortfolioAggregator::new(registry, Arc::new(AuditJournal::new()), Metrics::new().unwrap(), Duration::from_secs(5));
        let snapshot = aggregator.refresh().await;
        assert_eq!(snapshot.status, PortfolioStatus::Degraded);
        let offline_entry = snapshot.venues.iter().find(|v| v.venue_id == "offline").unwrap();
        assert!(!offline_entry.available);
    }

    #[tokio::test]
    async fn zero_registered_venues_is_vacuously_healthy() {
        let registry = Arc::new(VenueRegistry::new(vec![]));
        let aggregator = PortfolioAggregator::new(registry, Arc::new(AuditJournal::new()), Metrics::new().unwrap(), Duration::from_secs(5));
        let snapshot = aggregator.refresh().await;
        assert_eq!(snapshot.status, PortfolioStatus::Healthy);
        assert_eq!(snapshot.total_grams, Decimal::ZERO);
    }

    #[tokio::test]
    async fn disabled_venue_is_reported_unavailable_without_calling_the_adapter() {
        let registry = Arc::new(VenueRegistry::new(vec![RegisteredVenue::exchange(descriptor("a", VenueKind::Exchange), Arc::new(FixedExchange { id: "a", native: dec!(1), health: HealthReport::Healthy }))]));
        registry.set_disabled("a", true);
        let aggregator = PortfolioAggregator::new(registry, Arc::new(AuditJournal::new()), Metrics::new().unwrap(), Duration::from_secs(5));
        let snapshot = aggregator.refresh().await;
        assert_eq!(snapshot.status, PortfolioStatus::Offline);
        assert!(!snapshot.venues[0].available);
    }
}
