//! Builds the axum `Router` for the API front (§4.5): routes, the combined
//! rate-limit/auth/audit/metrics middleware, and CORS.

use crate::application::Application;
use crate::interfaces::handlers;
use crate::interfaces::middleware::request_pipeline;
use crate::interfaces::state::AppState;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn build_router(app: Arc<Application>) -> Router {
    let observability_enabled = app.config.observability.enabled;
    let state = AppState::new(app);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route("/portfolio", get(handlers::portfolio))
        .route("/connectors", get(handlers::connectors))
        .route("/orders", post(handlers::place_order))
        .route("/orders/:id", get(handlers::get_order))
        .route("/audit/logs", get(handlers::audit_logs))
        .route("/admin/resilience", post(handlers::admin_resilience));

    if observability_enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router
        .layer(axum::middleware::from_fn_with_state(state.clone(), request_pipeline))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
