//! API Front (§4.5): the REST surface over the trading engine, portfolio
//! aggregator, venue registry, and audit journal.

mod dto;
mod error;
mod handlers;
mod middleware;
mod router;
mod state;

pub use router::build_router;
pub use state::AppState;
