//! Venue Registry: the one place every service looks up a venue by id.
//!
//! Holds the immutable set of adapters wired at boot plus the mutable
//! per-venue "disabled" flag the resilience dry-run hooks (§4.5,
//! `POST /admin/resilience`) flip; the set of registered venues itself never
//! changes after `Application::build`.

use crate::domain::ports::{ChainVenue, ExchangeVenue};
use crate::domain::types::VenueDescriptor;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// The capability a registered venue exposes, keeping the exchange/chain
/// split a capability record rather than an inheritance hierarchy (§9).
pub enum VenueHandle {
    Exchange(Arc<dyn ExchangeVenue>),
    Chain { venue: Arc<dyn ChainVenue>, watch_address: Option<String>, token_contract: Option<String> },
}

pub struct RegisteredVenue {
    pub descriptor: VenueDescriptor,
    pub handle: VenueHandle,
    disabled: AtomicBool,
}

impl RegisteredVenue {
    pub fn exchange(descriptor: VenueDescriptor, venue: Arc<dyn ExchangeVenue>) -> Self {
        Self { descriptor, handle: VenueHandle::Exchange(venue), disabled: AtomicBool::new(false) }
    }

    pub fn chain(descriptor: VenueDescriptor, venue: Arc<dyn ChainVenue>, watch_address: Option<String>, token_contract: Option<String>) -> Self {
        Self { descriptor, handle: VenueHandle::Chain { venue, watch_address, token_contract }, disabled: AtomicBool::new(false) }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }
}

/// Immutable-membership registry of every venue the process knows about.
/// Keyed by venue id; construction order is preserved for deterministic
/// iteration (candidate selection's venue-id tiebreak relies on a stable,
/// not a registration-order, comparison, but deterministic iteration still
/// keeps fan-out logs readable).
pub struct VenueRegistry {
    venues: HashMap<String, RegisteredVenue>,
}

impl VenueRegistry {
    pub fn new(venues: Vec<RegisteredVenue>) -> Self {
        Self { venues: venues.into_iter().map(|v| (v.descriptor.id.clone(), v)).collect() }
    }

    pub fn get(&self, venue_id: &str) -> Option<&RegisteredVenue> {
        self.venues.get(venue_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredVenue> {
        self.venues.values()
    }

    pub fn descriptors(&self) -> Vec<VenueDescriptor> {
        self.venues.values().map(|v| v.descriptor.clone()).collect()
    }

    /// Sets the resilience-dry-run disabled flag for a venue. Disabling a
    /// venue excludes it from portfolio refresh and trading-engine candidate
    /// selection without touching its underlying adapter or connections.
    pub fn set_disabled(&self, venue_id: &str, disabled: bool) -> bool {
        match self.venues.get(venue_id) {
            Some(venue) => {
                venue.disabled.store(disabled, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ChainVenue, ConfirmationStatus, ExchangeVenue, HealthReport};
    use crate::domain::security::Credentials;
    use crate::domain::types::{Capability, Holding, TransferObservation, VenueKind};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;

    struct StubExchange;
    #[async_trait]
    impl ExchangeVenue for StubExchange {
        fn id(&self) -> &str {
            "stub"
        }
        async fn authenticate(&self, _c: &Credentials) -> Result<(), crate::domain::errors::VenueError> {
            Ok(())
        }
        async fn health_check(&self) -> HealthReport {
            HealthReport::Healthy
        }
        async fn get_balance(&self, symbol: &str) -> Result<Holding, crate::domain::errors::VenueError> {
            Ok(Holding::new("stub", symbol, Decimal::ONE, Utc::now()))
        }
        async fn get_order_book(&self, _s: &str, _d: usize) -> Result<crate::domain::order_book::OrderBook, crate::domain::errors::VenueError> {
            Ok(crate::domain::order_book::OrderBook::default())
        }
        async fn place_limit_order(&self, _p: crate::domain::ports::PlaceOrderParams) -> Result<crate::domain::ports::VenueOrderStatus, crate::domain::errors::VenueError> {
            unimplemented!()
        }
        async fn cancel_order(&self, _id: &str) -> Result<(), crate::domain::errors::VenueError> {
            Ok(())
        }
        async fn get_order_status(&self, _id: &str) -> Result<crate::domain::ports::VenueOrderStatus, crate::domain::errors::VenueError> {
            unimplemented!()
        }
    }

    #[allow(dead_code)]
    struct StubChain;
    #[async_trait]
    impl ChainVenue for StubChain {
        fn id(&self) -> &str {
            "stub-chain"
        }
        async fn authenticate(&self, _c: &Credentials) -> Result<(), crate::domain::errors::VenueError> {
            Ok(())
        }
        async fn health_check(&self) -> HealthReport {
            HealthReport::Healthy
        }
        async fn get_balance(&self, _a: &str, _t: &str) -> Result<Holding, crate::domain::errors::VenueError> {
            unimplemented!()
        }
        async fn track_transfers(&self, _a: &str, _t: &str) -> Result<Vec<TransferObservation>, crate::domain::errors::VenueError> {
            Ok(vec![])
        }
        async fn get_confirmation_status(&self, _tx: &str) -> Result<ConfirmationStatus, crate::domain::errors::VenueError> {
            unimplemented!()
        }
        async fn set_confirmation_threshold(&self, _n: u64) -> Result<(), crate::domain::errors::VenueError> {
            Ok(())
        }
    }

    fn descriptor(id: &str, kind: VenueKind) -> VenueDescriptor {
        VenueDescriptor { id: id.into(), kind, display_name: id.into(), capabilities: vec![Capability::BalanceQuery, Capability::LimitOrders] }
    }

    #[test]
    fn registry_looks_up_by_id_and_tracks_disabled_flag() {
        let registry = VenueRegistry::new(vec![RegisteredVenue::exchange(descriptor("stub", VenueKind::Exchange), Arc::new(StubExchange))]);
        assert!(registry.get("stub").is_some());
        assert!(!registry.get("stub").unwrap().is_disabled());
        assert!(registry.set_disabled("stub", true));
        assert!(registry.get("stub").unwrap().is_disabled());
        assert!(!registry.set_disabled("missing", true));
    }
}
