//! The `{code, message, requestId, details?}` error envelope (§4.5) every
//! handler and middleware failure path returns through.

use crate::config::Profile;
use crate::domain::errors::{ErrorCode, VenueError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value};

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::AuthError | ErrorCode::PermissionError => StatusCode::UNAUTHORIZED,
        ErrorCode::ValidationError | ErrorCode::InvalidSymbolError => StatusCode::BAD_REQUEST,
        ErrorCode::RateLimitError => StatusCode::TOO_MANY_REQUESTS,
        ErrorCode::SlippageError | ErrorCode::InsufficientBalanceError => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::BreakerOpenError => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::NetworkError | ErrorCode::VenueError | ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Builds the envelope body, including `details` only in the development
/// profile (§4.5 endpoint table).
fn envelope(code: &str, message: &str, request_id: &str, details: Option<String>, profile: Profile) -> Value {
    let mut map = Map::new();
    map.insert("code".to_string(), Value::String(code.to_string()));
    map.insert("message".to_string(), Value::String(message.to_string()));
    map.insert("requestId".to_string(), Value::String(request_id.to_string()));
    if profile == Profile::Development {
        if let Some(details) = details {
            map.insert("details".to_string(), Value::String(details));
        }
    }
    Value::Object(map)
}

/// Renders a `VenueError` as its wire response, mapping the error's stable
/// code (§7) onto an HTTP status.
pub fn venue_error_response(profile: Profile, request_id: &str, err: &VenueError) -> Response {
    let code = err.code();
    let body = envelope(code.as_str(), &err.to_string(), request_id, Some(format!("{err:?}")), profile);
    (status_for(code), Json(body)).into_response()
}

pub fn unauthorized_response(request_id: &str) -> Response {
    let body = envelope(ErrorCode::AuthError.as_str(), "missing or malformed Authorization header", request_id, None, Profile::Production);
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

pub fn rate_limited_response(request_id: &str, reset_at: chrono::DateTime<chrono::Utc>) -> Response {
    let mut body = envelope(ErrorCode::RateLimitError.as_str(), "rate limit exceeded", request_id, None, Profile::Production);
    body.as_object_mut().unwrap().insert("resetTime".to_string(), Value::String(reset_at.to_rfc3339()));
    (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
}

pub fn validation_error_response(profile: Profile, request_id: &str, message: &str) -> Response {
    let body = envelope(ErrorCode::ValidationError.as_str(), message, request_id, None, profile);
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

pub fn not_found_response(profile: Profile, request_id: &str, resource: &str, id: &str) -> Response {
    let body = envelope(ErrorCode::NotFound.as_str(), &format!("{resource} not found: {id}"), request_id, None, profile);
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
