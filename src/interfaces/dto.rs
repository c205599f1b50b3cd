//! Request and query-string shapes for the API front's JSON surface.
//! Response bodies reuse the domain types directly (`Order`,
//! `PortfolioSnapshot`, `VenueDescriptor`, `AuditRecord`) since they already
//! derive `Serialize` with the wire shape this layer wants.

use crate::domain::types::OrderSide;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PlaceOrderBody {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub limit_price: Decimal,
    #[serde(default)]
    pub slippage_bps: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct PortfolioQuery {
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditLogQuery {
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminResilienceBody {
    DisableVenue { venue_id: String },
    EnableVenue { venue_id: String },
    RaiseConfirmationThreshold { venue_id: String, value: u64 },
}
