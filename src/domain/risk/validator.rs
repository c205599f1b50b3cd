//! Pre-trade check pipeline.
//!
//! Mirrors the upstream trading system's `RiskValidator` pattern: each stage
//! is an independent, orderable check returning `Approve`/`Reject` against a
//! shared context, instead of one monolithic validation function.

use crate::domain::order_book::OrderBook;
use crate::domain::types::{OrderSide, VenueStatus};
use rust_decimal::Decimal;

/// Shared context every pre-trade check reads from. Immutable per candidate
/// venue; the engine builds a fresh one for each venue it scores.
pub struct ValidationContext<'a> {
    pub symbol: &'a str,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub limit_price: Decimal,
    pub slippage_bps: u32,
    pub venue_id: &'a str,
    pub venue_status: VenueStatus,
    pub venue_lists_symbol: bool,
    pub venue_supports_limit_orders: bool,
    pub order_book: Option<&'a OrderBook>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Approve,
    Reject(String),
}

impl ValidationResult {
    pub fn is_approved(&self) -> bool {
        matches!(self, ValidationResult::Approve)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            ValidationResult::Reject(reason) => Some(reason),
            ValidationResult::Approve => None,
        }
    }
}

/// An independent pre-trade check. `priority()` determines pipeline order,
/// lowest first.
pub trait RiskValidator: Send + Sync {
    fn name(&self) -> &'static str;
    fn priority(&self) -> u32;
    fn is_enabled(&self) -> bool {
        true
    }
    fn validate(&self, ctx: &ValidationContext) -> ValidationResult;
}

/// Venue must be registered, not offline, list the requested symbol, and
/// support limit orders.
pub struct CandidateSelectionValidator;

impl RiskValidator for CandidateSelectionValidator {
    fn name(&self) -> &'static str {
        "candidate_selection"
    }
    fn priority(&self) -> u32 {
        10
    }
    fn validate(&self, ctx: &ValidationContext) -> ValidationResult {
        if ctx.venue_status == VenueStatus::Offline {
            return ValidationResult::Reject(format!("venue {} is offline", ctx.venue_id));
        }
        if !ctx.venue_supports_limit_orders {
            return ValidationResult::Reject(format!("venue {} does not support limit orders", ctx.venue_id));
        }
        if !ctx.venue_lists_symbol {
            return ValidationResult::Reject(format!("venue {} does not list {}", ctx.venue_id, ctx.symbol));
        }
        ValidationResult::Approve
    }
}

/// Rejects if expected average fill deviates from the limit by more than
/// `slippage_bps`, or if available depth within the band is insufficient.
pub struct SlippageGuardValidator;

impl RiskValidator for SlippageGuardValidator {
    fn name(&self) -> &'static str {
        "slippage_guard"
    }
    fn priority(&self) -> u32 {
        20
    }
    fn validate(&self, ctx: &ValidationContext) -> ValidationResult {
        let Some(book) = ctx.order_book else {
            return ValidationResult::Reject("no order book available for slippage evaluation".into());
        };

        let depth = book.depth_within(ctx.side, ctx.limit_price, ctx.slippage_bps);
        if depth < ctx.quantity {
            return ValidationResult::Reject(format!(
                "available depth {} within {} bps is less than requested quantity {}",
                depth, ctx.slippage_bps, ctx.quantity
            ));
        }

        let Some(avg_fill) = book.expected_average_fill(ctx.side, ctx.limit_price, ctx.quantity) else {
            return ValidationResult::Reject("book cannot fill the requested quantity within the limit".into());
        };

        let deviation_bps = ((avg_fill - ctx.limit_price).abs() / ctx.limit_price) * Decimal::from(10_000);
        if deviation_bps > Decimal::from(ctx.slippage_bps) {
            return ValidationResult::Reject(format!(
                "expected average fill {} deviates {} bps from limit {}, exceeding {} bps",
                avg_fill, deviation_bps, ctx.limit_price, ctx.slippage_bps
            ));
        }

        ValidationResult::Approve
    }
}

/// Runs every enabled validator in priority order, stopping at the first
/// rejection.
pub fn run_pipeline(validators: &[Box<dyn RiskValidator>], ctx: &ValidationContext) -> ValidationResult {
    let mut ordered: Vec<&Box<dyn RiskValidator>> = validators.iter().filter(|v| v.is_enabled()).collect();
    ordered.sort_by_key(|v| v.priority());

    for validator in ordered {
        let result = validator.validate(ctx);
        if !result.is_approved() {
            return result;
        }
    }
    ValidationResult::Approve
}

pub fn default_pipeline() -> Vec<Box<dyn RiskValidator>> {
    vec![Box::new(CandidateSelectionValidator), Box::new(SlippageGuardValidator)]
}
