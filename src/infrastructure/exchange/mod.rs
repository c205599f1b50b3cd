pub mod bitfinex;
pub mod signing;
pub mod status;
pub mod symbols;

pub use bitfinex::BitfinexExchange;
