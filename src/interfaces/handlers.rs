//! Handlers for the API front's REST surface (§4.5).

use crate::application::trading_engine::PlaceOrderRequest;
use crate::application::venue_registry::VenueHandle;
use crate::domain::audit::record::{AuditDetails, AuditKind};
use crate::domain::errors::VenueError;
use crate::domain::ports::EventSink;
use crate::domain::types::{RequestContext, VenueDescriptor};
use crate::interfaces::dto::{AdminResilienceBody, AuditLogQuery, PlaceOrderBody, PortfolioQuery};
use crate::interfaces::error::{not_found_response, validation_error_response, venue_error_response};
use crate::interfaces::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub async fn health(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>) -> Response {
    let snapshot = state.app.portfolio.refresh().await;
    let status_label = match snapshot.status {
        crate::domain::types::PortfolioStatus::Healthy => "healthy",
        crate::domain::types::PortfolioStatus::Degraded => "degraded",
        crate::domain::types::PortfolioStatus::Offline => "offline",
    };
    let http_status = match snapshot.status {
        crate::domain::types::PortfolioStatus::Offline => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    #[derive(Serialize)]
    struct VenueHealth {
        #[serde(rename = "venueId")]
        venue_id: String,
        available: bool,
    }
    #[derive(Serialize)]
    struct HealthBody {
        status: &'static str,
        venues: Vec<VenueHealth>,
        #[serde(rename = "builtAt")]
        built_at: DateTime<Utc>,
        #[serde(rename = "requestId")]
        request_id: String,
    }

    let body = HealthBody {
        status: status_label,
        venues: snapshot.venues.iter().map(|v| VenueHealth { venue_id: v.venue_id.clone(), available: v.available }).collect(),
        built_at: snapshot.built_at,
        request_id: ctx.correlation_id,
    };
    (http_status, Json(body)).into_response()
}

pub async fn portfolio(State(state): State<AppState>, Query(query): Query<PortfolioQuery>) -> Response {
    let snapshot = if query.refresh { state.app.portfolio.refresh().await } else { state.app.portfolio.latest().await };
    Json(snapshot).into_response()
}

#[derive(Serialize)]
struct ConnectorView {
    #[serde(flatten)]
    descriptor: VenueDescriptor,
    disabled: bool,
    available: bool,
}

pub async fn connectors(State(state): State<AppState>) -> Response {
    let snapshot = state.app.portfolio.latest().await;
    let views: Vec<ConnectorView> = state
        .app
        .registry
        .iter()
        .map(|registered| {
            let available = snapshot.venues.iter().find(|v| v.venue_id == registered.descriptor.id).map(|v| v.available).unwrap_or(false);
            ConnectorView { descriptor: registered.descriptor.clone(), disabled: registered.is_disabled(), available }
        })
        .collect();
    Json(views).into_response()
}

pub async fn place_order(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>, Json(body): Json<PlaceOrderBody>) -> Response {
    let request = PlaceOrderRequest { symbol: body.symbol, side: body.side, quantity: body.quantity, limit_price: body.limit_price, slippage_bps: body.slippage_bps };
    match state.app.trading_engine.place_limit_order(request).await {
        Ok(order) => (StatusCode::CREATED, Json(order)).into_response(),
        Err(err) => venue_error_response(state.profile, &ctx.correlation_id, &err),
    }
}

pub async fn get_order(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>, Path(order_id): Path<String>) -> Response {
    match state.app.trading_engine.sync_order_status(&order_id).await {
        Ok(order) => Json(order).into_response(),
        Err(VenueError::NotFound { resource, id }) => not_found_response(state.profile, &ctx.correlation_id, &resource, &id),
        Err(err) => venue_error_response(state.profile, &ctx.correlation_id, &err),
    }
}

pub async fn audit_logs(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>, Query(query): Query<AuditLogQuery>) -> Response {
    let from = match query.start_date.as_deref().map(DateTime::parse_from_rfc3339) {
        Some(Ok(dt)) => Some(dt.with_timezone(&Utc)),
        Some(Err(_)) => return validation_error_response(state.profile, &ctx.correlation_id, "startDate must be RFC3339"),
        None => None,
    };
    let to = match query.end_date.as_deref().map(DateTime::parse_from_rfc3339) {
        Some(Ok(dt)) => Some(dt.with_timezone(&Utc)),
        Some(Err(_)) => return validation_error_response(state.profile, &ctx.correlation_id, "endDate must be RFC3339"),
        None => None,
    };
    Json(state.app.audit.export(from, to)).into_response()
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], state.app.metrics.render()).into_response()
}

pub async fn admin_resilience(State(state): State<AppState>, Extension(ctx): Extension<RequestContext>, Json(body): Json<AdminResilienceBody>) -> Response {
    let (venue_id, action, value) = match &body {
        AdminResilienceBody::DisableVenue { venue_id } => (venue_id.clone(), "disable_venue", None),
        AdminResilienceBody::EnableVenue { venue_id } => (venue_id.clone(), "enable_venue", None),
        AdminResilienceBody::RaiseConfirmationThreshold { venue_id, value } => (venue_id.clone(), "raise_confirmation_threshold", Some(*value)),
    };

    let result: Result<(), VenueError> = match body {
        AdminResilienceBody::DisableVenue { venue_id } => {
            if state.app.registry.set_disabled(&venue_id, true) {
                Ok(())
            } else {
                return validation_error_response(state.profile, &ctx.correlation_id, &format!("unknown venue {venue_id}"));
            }
        }
        AdminResilienceBody::EnableVenue { venue_id } => {
            if state.app.registry.set_disabled(&venue_id, false) {
                Ok(())
            } else {
                return validation_error_response(state.profile, &ctx.correlation_id, &format!("unknown venue {venue_id}"));
            }
        }
        AdminResilienceBody::RaiseConfirmationThreshold { venue_id, value } => {
            let Some(registered) = state.app.registry.get(&venue_id) else {
                return validation_error_response(state.profile, &ctx.correlation_id, &format!("unknown venue {venue_id}"));
            };
            let VenueHandle::Chain { venue, .. } = &registered.handle else {
                return validation_error_response(state.profile, &ctx.correlation_id, &format!("{venue_id} is not a chain venue"));
            };
            venue.set_confirmation_threshold(value).await
        }
    };

    match result {
        Ok(()) => {
            state
                .app
                .audit
                .record(
                    AuditKind::ResilienceAction,
                    AuditDetails::ResilienceEvent { action: action.to_string(), target: venue_id.clone(), value: value.map(|v| v.to_string()) },
                    None,
                    Some(venue_id),
                )
                .await;
            (StatusCode::OK, Json(serde_json::json!({ "ok": true, "requestId": ctx.correlation_id }))).into_response()
        }
        Err(err) => venue_error_response(state.profile, &ctx.correlation_id, &err),
    }
}
