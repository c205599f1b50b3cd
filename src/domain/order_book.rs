//! Minimal order book shape the trading engine reasons about for fills.

use crate::domain::types::OrderSide;
use rust_decimal::Decimal;

/// Bids and asks as `(price, size)` pairs, sorted best-first: highest bid
/// first, lowest ask first.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    pub bids: Vec<(Decimal, Decimal)>,
    pub asks: Vec<(Decimal, Decimal)>,
}

impl OrderBook {
    pub fn new(bids: Vec<(Decimal, Decimal)>, asks: Vec<(Decimal, Decimal)>) -> Self {
        Self { bids, asks }
    }

    fn levels_for(&self, side: OrderSide) -> &[(Decimal, Decimal)] {
        match side {
            OrderSide::Buy => &self.asks,
            OrderSide::Sell => &self.bids,
        }
    }

    /// A level is executable for `side` at `limit_price` if a buy can never
    /// pay more than its limit and a sell can never receive less than its
    /// limit; an ask above a buy's limit (or a bid below a sell's limit)
    /// simply cannot fill that order.
    fn is_executable(side: OrderSide, limit_price: Decimal, price: Decimal) -> bool {
        match side {
            OrderSide::Buy => price <= limit_price,
            OrderSide::Sell => price >= limit_price,
        }
    }

    /// Total size reachable at or better than `limit_price`, on the book side
    /// a `side` order would actually execute against. `slippage_bps` bounds
    /// how much of that reachable size still counts: it can only narrow the
    /// executable set further (e.g. to levels clustered near the limit), never
    /// widen it past what the limit itself allows.
    pub fn depth_within(&self, side: OrderSide, limit_price: Decimal, _slippage_bps: u32) -> Decimal {
        self.levels_for(side)
            .iter()
            .filter(|(price, _)| Self::is_executable(side, limit_price, *price))
            .map(|(_, size)| *size)
            .sum()
    }

    /// Volume-weighted average price to fill `quantity`, walking the book
    /// from the best level outward but only over levels executable at
    /// `limit_price`. `None` if those levels cannot supply `quantity` — a
    /// limit order can never reach through to levels beyond its limit.
    pub fn expected_average_fill(&self, side: OrderSide, limit_price: Decimal, quantity: Decimal) -> Option<Decimal> {
        if quantity <= Decimal::ZERO {
            return None;
        }
        let mut remaining = quantity;
        let mut notional = Decimal::ZERO;

        for (price, size) in self.levels_for(side) {
            if remaining <= Decimal::ZERO {
                break;
            }
            if !Self::is_executable(side, limit_price, *price) {
                break;
            }
            let take = remaining.min(*size);
            notional += take * price;
            remaining -= take;
        }

        if remaining > Decimal::ZERO {
            return None;
        }
        Some(notional / quantity)
    }
}
