//! Request pipeline middleware: rate-limit, then authenticate, then audit
//! the inbound request, then dispatch to the handler, then record metrics
//! on the way back out (§4.5's ordered middleware stack, implemented here
//! as one combined layer since axum's `Next` already gives us a single
//! pre/post seam per request).

use crate::domain::audit::record::{AuditDetails, AuditKind};
use crate::domain::ports::EventSink;
use crate::domain::types::RequestContext;
use crate::interfaces::error::{rate_limited_response, unauthorized_response};
use crate::interfaces::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use serde_json::{Map, Value};
use std::time::Instant;
use uuid::Uuid;

fn client_identity(req: &Request) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()).and_then(|v| v.strip_prefix("Bearer "))
}

pub async fn request_pipeline(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let path = req.uri().path().to_string();
    let identity = client_identity(&req);

    if !state.rate_limiter.allow(&identity) {
        let reset_at = state.rate_limiter.reset_at(&identity);
        return rate_limited_response(&Uuid::new_v4().to_string(), reset_at);
    }

    let authorized = bearer_token(&req).is_some_and(|t| state.auth_tokens.contains(t));
    if !authorized {
        state
            .app
            .audit
            .record(AuditKind::AuthFail, AuditDetails::Generic(generic(&[("path", &path), ("client", &identity)])), None, None)
            .await;
        return unauthorized_response(&Uuid::new_v4().to_string());
    }

    let ctx = RequestContext { correlation_id: Uuid::new_v4().to_string(), client_identity: identity.clone(), received_at: Utc::now() };

    let mut req = req;
    req.extensions_mut().insert(ctx.clone());

    state
        .app
        .audit
        .record(AuditKind::ApiRequest, AuditDetails::Generic(generic(&[("path", &path), ("client", &identity), ("requestId", &ctx.correlation_id)])), None, None)
        .await;

    let response = next.run(req).await;

    let status = response.status().as_u16();
    state.app.metrics.record_api_request(&path, status, start.elapsed().as_secs_f64());

    response
}

fn generic(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs.iter().map(|(k, v)| (k.to_string(), Value::String(v.to_string()))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_identity_falls_back_to_unknown() {
        let req = Request::builder().uri("/health").body(axum::body::Body::empty()).unwrap();
        assert_eq!(client_identity(&req), "unknown");
    }

    #[test]
    fn client_identity_takes_the_first_hop_of_forwarded_for() {
        let req = Request::builder().uri("/health").header("x-forwarded-for", "203.0.113.9, 10.0.0.1").body(axum::body::Body::empty()).unwrap();
        assert_eq!(client_identity(&req), "203.0.113.9");
    }
}
