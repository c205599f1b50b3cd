//! Fixed status-string mapping from the reference exchange's vocabulary to
//! the internal `OrderStatus` (§4.1).

use crate::domain::types::OrderStatus;

pub fn map_order_status(venue_status: &str) -> OrderStatus {
    match venue_status.to_ascii_lowercase().as_str() {
        "live" | "active" => OrderStatus::Pending,
        "partially filled" => OrderStatus::Partial,
        "executed" | "filled" => OrderStatus::Filled,
        "canceled" | "cancelled" => OrderStatus::Cancelled,
        "rejected" => OrderStatus::Rejected,
        _ => OrderStatus::Pending,
    }
}
