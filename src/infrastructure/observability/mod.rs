//! Pull-based observability: a Prometheus registry rendered by the API
//! front's `GET /metrics` endpoint (§4.5). Unlike this repository's
//! push-based reporter (no incoming HTTP server), the routing layer already
//! runs an HTTP server for its REST surface, so metrics are exposed
//! directly rather than pushed to a gateway.

pub mod metrics;

pub use metrics::Metrics;
