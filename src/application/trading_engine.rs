//! Trading Engine (§4.3): routes a protected limit order to the best
//! healthy candidate venue under the slippage/depth policy, enforcing
//! pre-trade risk checks and recording every decision.
//!
//! The pipeline mirrors `domain::risk::validator`'s ordered-check shape:
//! candidate selection narrows the pool, scoring orders it, the slippage
//! guard vetoes the top pick, and any venue-specific filters run last.
//! Execution allows exactly one fallback retry on submission failure; the
//! guard stages do not retry across candidates (§4.3 item 3 vs item 4).

use crate::application::venue_registry::VenueRegistry;
use crate::domain::audit::record::{AuditDetails, AuditKind};
use crate::domain::errors::VenueError;
use crate::domain::order_book::OrderBook;
use crate::domain::ports::{EventSink, ExchangeVenue, PlaceOrderParams, VenueOrderStatus};
use crate::domain::risk::validator::{CandidateSelectionValidator, RiskValidator, SlippageGuardValidator, ValidationContext, ValidationResult, run_pipeline};
use crate::domain::types::{Capability, Order, OrderSide, OrderStatus, VenueStatus};
use crate::infrastructure::observability::Metrics;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PlaceOrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub limit_price: Decimal,
    pub slippage_bps: u32,
}

struct Candidate {
    venue_id: String,
    venue: Arc<dyn ExchangeVenue>,
    status: VenueStatus,
    supports_limit_orders: bool,
    order_book: Option<OrderBook>,
    latency_ms: u128,
    error_rate: f64,
}

impl Candidate {
    fn top_price(&self, side: OrderSide) -> Option<Decimal> {
        let book = self.order_book.as_ref()?;
        match side {
            OrderSide::Buy => book.asks.first().map(|(p, _)| *p),
            OrderSide::Sell => book.bids.first().map(|(p, _)| *p),
        }
    }

    fn validation_context<'a>(&'a self, req: &'a PlaceOrderRequest) -> ValidationContext<'a> {
        ValidationContext {
            symbol: &req.symbol,
            side: req.side,
            quantity: req.quantity,
            limit_price: req.limit_price,
            slippage_bps: req.slippage_bps,
            venue_id: &self.venue_id,
            venue_status: self.status,
            venue_lists_symbol: self.order_book.is_some(),
            venue_supports_limit_orders: self.supports_limit_orders,
            order_book: self.order_book.as_ref(),
        }
    }
}

pub struct TradingEngine {
    registry: Arc<VenueRegistry>,
    sink: Arc<dyn EventSink>,
    metrics: Metrics,
    order_book_depth: usize,
    extra_validators: Vec<Box<dyn RiskValidator>>,
    orders: RwLock<HashMap<String, Order>>,
}

impl TradingEngine {
    pub fn new(registry: Arc<VenueRegistry>, sink: Arc<dyn EventSink>, metrics: Metrics, order_book_depth: usize, extra_validators: Vec<Box<dyn RiskValidator>>) -> Self {
        Self { registry, sink, metrics, order_book_depth, extra_validators, orders: RwLock::new(HashMap::new()) }
    }

    /// Returns a previously placed order by id without contacting the venue.
    pub async fn get_order(&self, order_id: &str) -> Option<Order> {
        self.orders.read().await.get(order_id).cloned()
    }

    /// Refreshes a non-terminal order's status from its venue, updating the
    /// registry and emitting a terminal audit record if the status advanced
    /// into one.
    pub async fn sync_order_status(&self, order_id: &str) -> Result<Order, VenueError> {
        let snapshot = self.orders.read().await.get(order_id).cloned().ok_or_else(|| VenueError::NotFound { resource: "order".into(), id: order_id.to_string() })?;
        if snapshot.status.is_terminal() {
            return Ok(snapshot);
        }
        let Some(registered) = self.registry.get(&snapshot.venue_id) else {
            return Ok(snapshot);
        };
        let crate::application::venue_registry::VenueHandle::Exchange(venue) = &registered.handle else {
            return Ok(snapshot);
        };
        let Ok(venue_status) = venue.get_order_status(order_id).await else {
            return Ok(snapshot);
        };
        self.apply_venue_status(order_id, venue_status).await
    }

    /// Cancels a resting order at its venue and records the terminal
    /// transition.
    pub async fn cancel_order(&self, order_id: &str) -> Result<Order, VenueError> {
        let snapshot = self.orders.read().await.get(order_id).cloned().ok_or_else(|| VenueError::NotFound { resource: "order".into(), id: order_id.to_string() })?;
        if snapshot.status.is_terminal() {
            return Ok(snapshot);
        }
        let registered = self.registry.get(&snapshot.venue_id).ok_or_else(|| VenueError::NotFound { resource: "venue".into(), id: snapshot.venue_id.clone() })?;
        let crate::application::venue_registry::VenueHandle::Exchange(venue) = &registered.handle else {
            return Err(VenueError::Internal { reason: "order venue is not an exchange".into() });
        };
        // A cancel that races a fill must still reconcile with the venue's
        // view: re-query status rather than assume "cancelled" succeeded.
        if let Err(err) = venue.cancel_order(order_id).await {
            if let Ok(status) = venue.get_order_status(order_id).await {
                return self.apply_venue_status(order_id, status).await;
            }
            return Err(err);
        }
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(order_id).ok_or_else(|| VenueError::NotFound { resource: "order".into(), id: order_id.to_string() })?;
        order.transition(OrderStatus::Cancelled).map_err(|reason| VenueError::Internal { reason })?;
        let updated = order.clone();
        drop(orders);
        self.metrics.record_order(side_label(updated.side), "cancelled");
        self.emit_order_event(AuditKind::OrderCancelled, &updated).await;
        Ok(updated)
    }

    async fn apply_venue_status(&self, order_id: &str, venue_status: VenueOrderStatus) -> Result<Order, VenueError> {
        let mut orders = self.orders.write().await;
        let order = orders.get_mut(order_id).ok_or_else(|| VenueError::NotFound { resource: "order".into(), id: order_id.to_string() })?;
        if order.status == venue_status.status {
            return Ok(order.clone());
        }
        if !order.status.can_transition_to(venue_status.status) {
            return Ok(order.clone());
        }
        order.transition(venue_status.status).map_err(|reason| VenueError::Internal { reason })?;
        order.fills = venue_status.fills;
        if venue_status.status.is_terminal() {
            order.executed_at = Some(Utc::now());
        }
        let updated = order.clone();
        let terminal_kind = match updated.status {
            OrderStatus::Filled => Some(AuditKind::OrderFilled),
            OrderStatus::Cancelled => Some(AuditKind::OrderCancelled),
            OrderStatus::Rejected | OrderStatus::Expired => Some(AuditKind::OrderFailed),
            _ => None,
        };
        drop(orders);
        if let Some(kind) = terminal_kind {
            self.metrics.record_order(side_label(updated.side), status_label(updated.status));
            self.emit_order_event(kind, &updated).await;
        }
        Ok(updated)
    }

    async fn gather_candidates(&self, symbol: &str) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for registered in self.registry.iter() {
            if registered.is_disabled() {
                continue;
            }
            let crate::application::venue_registry::VenueHandle::Exchange(venue) = &registered.handle else {
                continue;
            };
            let health: VenueStatus = venue.health_check().await.into();
            let order_book = venue.get_order_book(symbol, self.order_book_depth).await.ok();
            candidates.push(Candidate {
                venue_id: registered.descriptor.id.clone(),
                venue: venue.clone(),
                status: health,
                supports_limit_orders: registered.descriptor.has_capability(Capability::LimitOrders),
                order_book,
                latency_ms: venue.latency_hint().await.as_millis(),
                error_rate: venue.error_rate_hint().await,
            });
        }
        candidates
    }

    /// Orders eligible candidates best-first: top-of-book price, then depth
    /// within the slippage band, then latency, then error rate, then
    /// venue-id for a deterministic tiebreak.
    fn score(mut candidates: Vec<Candidate>, req: &PlaceOrderRequest) -> Vec<Candidate> {
        candidates.sort_by(|a, b| {
            let price_a = a.top_price(req.side);
            let price_b = b.top_price(req.side);
            let price_cmp = match req.side {
                OrderSide::Buy => price_a.cmp(&price_b),
                OrderSide::Sell => price_b.cmp(&price_a),
            };
            let depth_a = a.order_book.as_ref().map(|b| b.depth_within(req.side, req.limit_price, req.slippage_bps)).unwrap_or(Decimal::ZERO);
            let depth_b = b.order_book.as_ref().map(|b| b.depth_within(req.side, req.limit_price, req.slippage_bps)).unwrap_or(Decimal::ZERO);
            price_cmp
                .then_with(|| depth_b.cmp(&depth_a))
                .then_with(|| a.latency_ms.cmp(&b.latency_ms))
                .then_with(|| a.error_rate.partial_cmp(&b.error_rate).unwrap_or(std::cmp::Ordering::Equal))
                .then_with(|| a.venue_id.cmp(&b.venue_id))
        });
        candidates
    }

    async fn emit_risk_block(&self, stage: &str, reason: &str, symbol: &str) {
        self.sink
            .record(AuditKind::RiskBlock, AuditDetails::RiskBlockEvent { stage: stage.to_string(), reason: reason.to_string(), symbol: symbol.to_string() }, None, None)
            .await;
    }

    async fn emit_order_event(&self, kind: AuditKind, order: &Order) {
        self.sink
            .record(
                kind,
                AuditDetails::OrderEvent {
                    order_id: order.id.clone(),
                    venue_id: order.venue_id.clone(),
                    symbol: order.symbol.clone(),
                    side: side_label(order.side).to_string(),
                    quantity: order.quantity.to_string(),
                    limit_price: order.limit_price.to_string(),
                    status: status_label(order.status).to_string(),
                },
                None,
                Some(order.venue_id.clone()),
            )
            .await;
    }

    /// Runs the pre-trade pipeline and, on approval, submits to the chosen
    /// venue with a single fallback retry on submission failure.
    pub async fn place_limit_order(&self, req: PlaceOrderRequest) -> Result<Order, VenueError> {
        let candidates = self.gather_candidates(&req.symbol).await;

        let mut eligible = Vec::new();
        let mut selection_rejection: Option<String> = None;
        for candidate in candidates {
            let ctx = candidate.validation_context(&req);
            match CandidateSelectionValidator.validate(&ctx) {
                ValidationResult::Approve => eligible.push(candidate),
                ValidationResult::Reject(reason) => selection_rejection = Some(reason),
            }
        }

        if eligible.is_empty() {
            let reason = selection_rejection.unwrap_or_else(|| format!("no registered venue lists {}", req.symbol));
            self.emit_risk_block("candidate_selection", &reason, &req.symbol).await;
            return Err(VenueError::InvalidSymbol { venue_id: String::new(), symbol: req.symbol });
        }

        let scored = Self::score(eligible, &req);
        let best = &scored[0];
        let best_ctx = best.validation_context(&req);

        if let ValidationResult::Reject(reason) = SlippageGuardValidator.validate(&best_ctx) {
            self.emit_risk_block("slippage_guard", &reason, &req.symbol).await;
            return Err(VenueError::SlippageError { reason });
        }

        if !self.extra_validators.is_empty() {
            if let ValidationResult::Reject(reason) = run_pipeline(&self.extra_validators, &best_ctx) {
                self.emit_risk_block("venue_risk_filter", &reason, &req.symbol).await;
                return Err(VenueError::ValidationError { reason });
            }
        }

        let order_id = Uuid::new_v4().to_string();
        let mut order = Order {
            id: order_id.clone(),
            venue_id: String::new(),
            symbol: req.symbol.clone(),
            side: req.side,
            quantity: req.quantity,
            limit_price: req.limit_price,
            slippage_bps: req.slippage_bps,
            status: OrderStatus::New,
            created_at: Utc::now(),
            executed_at: None,
            fills: Vec::new(),
        };
        self.emit_order_event(AuditKind::OrderPlaced, &order).await;

        let params = PlaceOrderParams { symbol: req.symbol.clone(), side: req.side, quantity: req.quantity, limit_price: req.limit_price };
        let fallback = scored.get(1);

        match self.try_submit(&scored[0], params.clone()).await {
            Ok(status) => {
                self.finalize_submission(&mut order, &scored[0].venue_id, status).await;
                self.orders.write().await.insert(order_id, order.clone());
                return Ok(order);
            }
            Err(primary_err) => {
                let Some(fallback) = fallback else {
                    order.transition(OrderStatus::Rejected).map_err(|reason| VenueError::Internal { reason })?;
                    self.metrics.record_order(side_label(order.side), "rejected");
                    self.emit_order_event(AuditKind::OrderFailed, &order).await;
                    self.orders.write().await.insert(order_id, order.clone());
                    return Err(primary_err);
                };
                match self.try_submit(fallback, params).await {
                    Ok(status) => {
                        self.finalize_submission(&mut order, &fallback.venue_id, status).await;
                        self.orders.write().await.insert(order_id, order.clone());
                        Ok(order)
                    }
                    Err(_fallback_err) => {
                        order.transition(OrderStatus::Rejected).map_err(|reason| VenueError::Internal { reason })?;
                        self.metrics.record_order(side_label(order.side), "rejected");
                        self.emit_order_event(AuditKind::OrderFailed, &order).await;
                        self.orders.write().await.insert(order_id, order.clone());
                        Err(primary_err)
                    }
                }
            }
        }
    }

    async fn try_submit(&self, candidate: &Candidate, params: PlaceOrderParams) -> Result<VenueOrderStatus, VenueError> {
        candidate.venue.place_limit_order(params).await
    }

    async fn finalize_submission(&self, order: &mut Order, venue_id: &str, venue_status: VenueOrderStatus) {
        order.venue_id = venue_id.to_string();
        let _ = order.transition(OrderStatus::Pending);
        if venue_status.status != OrderStatus::Pending && order.status.can_transition_to(venue_status.status) {
            let _ = order.transition(venue_status.status);
        }
        order.fills = venue_status.fills;
        if order.status.is_terminal() {
            order.executed_at = Some(Utc::now());
        }
        self.metrics.record_order(side_label(order.side), status_label(order.status));
        self.emit_order_event(AuditKind::OrderPlaced, order).await;
        if order.status.is_terminal() {
            let kind = match order.status {
                OrderStatus::Filled => AuditKind::OrderFilled,
                OrderStatus::Cancelled => AuditKind::OrderCancelled,
                _ => AuditKind::OrderFailed,
            };
            self.emit_order_event(kind, order).await;
        }
    }
}

fn side_label(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "buy",
        OrderSide::Sell => "sell",
    }
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::New => "new",
        OrderStatus::Pending => "pending",
        OrderStatus::Partial => "partial",
        OrderStatus::Filled => "filled",
        OrderStatus::Cancelled => "cancelled",
        OrderStatus::Rejected => "rejected",
        OrderStatus::Expired => "expired",
    }
}
