//! Core domain value types shared by every component.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Troy-ounce-to-gram conversion used for XAUt holdings.
pub const TROY_OUNCE_TO_GRAM: Decimal = dec!(31.1034768);

/// Normalizes a native balance of `symbol` into grams of gold.
///
/// Unknown symbols normalize to zero; callers are responsible for flagging
/// that case for user review.
pub fn grams_for(symbol: &str, native: Decimal) -> Decimal {
    match symbol.to_ascii_uppercase().as_str() {
        "XAUT" => native * TROY_OUNCE_TO_GRAM,
        "KAU" => native,
        _ => Decimal::ZERO,
    }
}

pub fn is_known_symbol(symbol: &str) -> bool {
    matches!(symbol.to_ascii_uppercase().as_str(), "XAUT" | "KAU")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueKind {
    Exchange,
    OnChain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueStatus {
    Healthy,
    Degraded,
    Offline,
}

/// Capabilities a venue declares; the trading engine filters candidates on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    LimitOrders,
    BalanceQuery,
    TransferTracking,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueDescriptor {
    pub id: String,
    pub kind: VenueKind,
    pub display_name: String,
    pub capabilities: Vec<Capability>,
}

impl VenueDescriptor {
    pub fn has_capability(&self, cap: Capability) -> bool {
        self.capabilities.contains(&cap)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order lifecycle. Transitions are monotonic; see `OrderStatus::can_transition_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    Pending,
    Partial,
    Filled,
    Cancelled,
    Rejected,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }

    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        if self == next {
            return false;
        }
        match (self, next) {
            (New, Pending) => true,
            (New, Rejected) => true,
            (Pending, Partial) => true,
            (Pending, Filled) => true,
            (Pending, Cancelled) => true,
            (Pending, Rejected) => true,
            (Pending, Expired) => true,
            (Partial, Filled) => true,
            (Partial, Cancelled) => true,
            (Partial, Expired) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub fill_id: String,
    pub order_id: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub fees: Decimal,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub venue_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub limit_price: Decimal,
    pub slippage_bps: u32,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub executed_at: Option<DateTime<Utc>>,
    pub fills: Vec<Fill>,
}

impl Order {
    /// Applies a status transition, returning an error if it would go backward.
    pub fn transition(&mut self, next: OrderStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "illegal order transition {:?} -> {:?} for order {}",
                self.status, next, self.id
            ));
        }
        self.status = next;
        Ok(())
    }

    pub fn filled_quantity(&self) -> Decimal {
        self.fills.iter().map(|f| f.quantity).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub venue_id: String,
    pub symbol: String,
    pub native: Decimal,
    pub grams: Decimal,
    pub sampled_at: DateTime<Utc>,
}

impl Holding {
    pub fn new(venue_id: impl Into<String>, symbol: impl Into<String>, native: Decimal, sampled_at: DateTime<Utc>) -> Self {
        let symbol = symbol.into();
        let grams = grams_for(&symbol, native);
        Self {
            venue_id: venue_id.into(),
            symbol,
            native,
            grams,
            sampled_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueHoldings {
    pub venue_id: String,
    pub holdings: Vec<Holding>,
    pub available: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortfolioStatus {
    Healthy,
    Degraded,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub total_grams: Decimal,
    pub venues: Vec<VenueHoldings>,
    pub status: PortfolioStatus,
    pub built_at: DateTime<Utc>,
    /// Symbols observed that did not normalize under a known conversion rule.
    pub unrecognized_symbols: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferObservation {
    pub tx_hash: String,
    pub block_height: u64,
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    pub token: String,
    pub observed_at: DateTime<Utc>,
    pub confirmations: u64,
}

impl TransferObservation {
    pub fn is_confirmed(&self, threshold: u64) -> bool {
        self.confirmations >= threshold
    }
}

/// A request-scoped correlation context threaded through API middleware and
/// into every audit record the request triggers.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub client_identity: String,
    pub received_at: DateTime<Utc>,
}
