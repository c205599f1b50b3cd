//! Closed error taxonomy for the routing layer.
//!
//! Mirrors how the upstream trading system splits its domain errors into
//! purpose-built `thiserror` enums rather than one stringly-typed error,
//! with a single `VenueError` covering every subsystem here since the wire
//! codes are shared across venues, the trading engine, and the API front.

use thiserror::Error;

/// Stable wire codes, one per `VenueError` variant. Never reorder or reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    AuthError,
    PermissionError,
    ValidationError,
    RateLimitError,
    NetworkError,
    VenueError,
    InsufficientBalanceError,
    InvalidSymbolError,
    SlippageError,
    BreakerOpenError,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::AuthError => "AUTH_ERROR",
            ErrorCode::PermissionError => "PERMISSION_ERROR",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::RateLimitError => "RATE_LIMIT_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::VenueError => "VENUE_ERROR",
            ErrorCode::InsufficientBalanceError => "INSUFFICIENT_BALANCE_ERROR",
            ErrorCode::InvalidSymbolError => "INVALID_SYMBOL_ERROR",
            ErrorCode::SlippageError => "SLIPPAGE_ERROR",
            ErrorCode::BreakerOpenError => "BREAKER_OPEN_ERROR",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("authentication failed for venue {venue_id}: {reason}")]
    AuthError { venue_id: String, reason: String },

    #[error("credentials for venue {venue_id} declare a withdrawal permission")]
    PermissionError { venue_id: String },

    #[error("validation failed: {reason}")]
    ValidationError { reason: String },

    #[error("rate limit hit for venue {venue_id}")]
    RateLimitError { venue_id: String },

    #[error("network error calling {venue_id}: {reason}")]
    NetworkError { venue_id: String, reason: String },

    #[error("venue {venue_id} returned an upstream fault: {reason}")]
    VenueFault { venue_id: String, reason: String },

    #[error("venue {venue_id} reports insufficient balance")]
    InsufficientBalance { venue_id: String },

    #[error("venue {venue_id} does not list symbol {symbol}")]
    InvalidSymbol { venue_id: String, symbol: String },

    #[error("slippage guard refused order: {reason}")]
    SlippageError { reason: String },

    #[error("circuit breaker open for venue {venue_id}, retry after {retry_after_ms}ms")]
    BreakerOpen { venue_id: String, retry_after_ms: u64 },

    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },
}

impl VenueError {
    pub fn code(&self) -> ErrorCode {
        match self {
            VenueError::AuthError { .. } => ErrorCode::AuthError,
            VenueError::PermissionError { .. } => ErrorCode::PermissionError,
            VenueError::ValidationError { .. } => ErrorCode::ValidationError,
            VenueError::RateLimitError { .. } => ErrorCode::RateLimitError,
            VenueError::NetworkError { .. } => ErrorCode::NetworkError,
            VenueError::VenueFault { .. } => ErrorCode::VenueError,
            VenueError::InsufficientBalance { .. } => ErrorCode::InsufficientBalanceError,
            VenueError::InvalidSymbol { .. } => ErrorCode::InvalidSymbolError,
            VenueError::SlippageError { .. } => ErrorCode::SlippageError,
            VenueError::BreakerOpen { .. } => ErrorCode::BreakerOpenError,
            VenueError::NotFound { .. } => ErrorCode::NotFound,
            VenueError::Internal { .. } => ErrorCode::InternalError,
        }
    }
}

/// Answers whether the reliability envelope's retry policy should re-attempt
/// the call that produced this error, without re-deriving it from a message.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for VenueError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            VenueError::RateLimitError { .. } | VenueError::NetworkError { .. } | VenueError::VenueFault { .. }
        )
    }
}
