//! Port interfaces every adapter and service composes against.
//!
//! Dependencies flow one way: leaf services (adapters, the trading engine)
//! receive a write-only `EventSink` capability for the audit journal instead
//! of holding a back-reference to it or to their caller.

use crate::domain::audit::record::{AuditDetails, AuditKind};
use crate::domain::errors::VenueError;
use crate::domain::security::credentials::Credentials;
use crate::domain::types::{Holding, TransferObservation, VenueStatus};
use async_trait::async_trait;

/// One-way write capability into the audit journal. Implemented by
/// `AuditJournal` itself; adapters and services only ever see this trait.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn record(
        &self,
        kind: AuditKind,
        details: AuditDetails,
        subject: Option<String>,
        venue_id: Option<String>,
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthReport {
    Healthy,
    Degraded,
    Offline,
}

impl From<HealthReport> for VenueStatus {
    fn from(h: HealthReport) -> Self {
        match h {
            HealthReport::Healthy => VenueStatus::Healthy,
            HealthReport::Degraded => VenueStatus::Degraded,
            HealthReport::Offline => VenueStatus::Offline,
        }
    }
}

/// Parameters for a protected limit order, shared by every exchange adapter.
#[derive(Debug, Clone)]
pub struct PlaceOrderParams {
    pub symbol: String,
    pub side: crate::domain::types::OrderSide,
    pub quantity: rust_decimal::Decimal,
    pub limit_price: rust_decimal::Decimal,
}

#[derive(Debug, Clone)]
pub struct VenueOrderStatus {
    pub venue_order_id: String,
    pub status: crate::domain::types::OrderStatus,
    pub fills: Vec<crate::domain::types::Fill>,
}

/// Capability implemented by centralized-exchange connectors.
#[async_trait]
pub trait ExchangeVenue: Send + Sync {
    fn id(&self) -> &str;

    async fn authenticate(&self, credentials: &Credentials) -> Result<(), VenueError>;
    async fn health_check(&self) -> HealthReport;
    async fn get_balance(&self, symbol: &str) -> Result<Holding, VenueError>;
    async fn get_order_book(&self, symbol: &str, depth: usize) -> Result<crate::domain::order_book::OrderBook, VenueError>;
    async fn place_limit_order(&self, params: PlaceOrderParams) -> Result<VenueOrderStatus, VenueError>;
    async fn cancel_order(&self, venue_order_id: &str) -> Result<(), VenueError>;
    async fn get_order_status(&self, venue_order_id: &str) -> Result<VenueOrderStatus, VenueError>;

    /// Recent latency sample used by the trading engine's venue-scoring
    /// step (§4.3). Backed by the adapter's `ReliabilityEnvelope`; adapters
    /// with no envelope may leave the default of zero.
    async fn latency_hint(&self) -> std::time::Duration {
        std::time::Duration::ZERO
    }

    /// Trailing error rate, same scoring step. Default zero.
    async fn error_rate_hint(&self) -> f64 {
        0.0
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmationStatus {
    pub confirmations: u64,
    pub required: u64,
    pub is_confirmed: bool,
}

/// Capability implemented by on-chain trackers.
#[async_trait]
pub trait ChainVenue: Send + Sync {
    fn id(&self) -> &str;

    async fn authenticate(&self, credentials: &Credentials) -> Result<(), VenueError>;
    async fn health_check(&self) -> HealthReport;
    async fn get_balance(&self, address: &str, token_contract: &str) -> Result<Holding, VenueError>;
    async fn track_transfers(&self, address: &str, token_contract: &str) -> Result<Vec<TransferObservation>, VenueError>;
    async fn get_confirmation_status(&self, tx_hash: &str) -> Result<ConfirmationStatus, VenueError>;
    async fn set_confirmation_threshold(&self, n: u64) -> Result<(), VenueError>;
}
