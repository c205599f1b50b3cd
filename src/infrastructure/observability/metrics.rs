//! Prometheus metrics for the routing layer.
//!
//! All metrics use the `goldroute_` prefix. Exposed read-only via the
//! `GET /metrics` endpoint (§4.5) and separately summarized into the JSON
//! shape that endpoint returns alongside the raw Prometheus text.

use prometheus::{
    CounterVec, Gauge, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge, GenericGaugeVec},
};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    started_at: Instant,
    /// Total portfolio value in grams of gold.
    pub portfolio_total_grams: GenericGauge<AtomicF64>,
    /// Per-venue health: 1 = healthy, 0.5 = degraded, 0 = offline.
    pub venue_health: GenericGaugeVec<AtomicF64>,
    pub venue_error_rate: GenericGaugeVec<AtomicF64>,
    pub circuit_breaker_open: GenericGaugeVec<AtomicF64>,
    pub orders_total: CounterVec,
    pub api_requests_total: CounterVec,
    pub api_latency_seconds: HistogramVec,
    pub audit_records_total: GenericGauge<AtomicF64>,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let portfolio_total_grams = Gauge::with_opts(Opts::new("goldroute_portfolio_total_grams", "Total portfolio value in grams of gold"))?;
        registry.register(Box::new(portfolio_total_grams.clone()))?;

        let venue_health = GaugeVec::new(
            Opts::new("goldroute_venue_health", "Per-venue health (1=healthy, 0.5=degraded, 0=offline)"),
            &["venue_id"],
        )?;
        registry.register(Box::new(venue_health.clone()))?;

        let venue_error_rate = GaugeVec::new(Opts::new("goldroute_venue_error_rate", "Per-venue trailing error rate"), &["venue_id"])?;
        registry.register(Box::new(venue_error_rate.clone()))?;

        let circuit_breaker_open = GaugeVec::new(Opts::new("goldroute_circuit_breaker_open", "1 if the venue's breaker is open"), &["venue_id"])?;
        registry.register(Box::new(circuit_breaker_open.clone()))?;

        let orders_total = CounterVec::new(Opts::new("goldroute_orders_total", "Total orders by side and status"), &["side", "status"])?;
        registry.register(Box::new(orders_total.clone()))?;

        let api_requests_total = CounterVec::new(Opts::new("goldroute_api_requests_total", "Total API requests by path and status"), &["path", "status"])?;
        registry.register(Box::new(api_requests_total.clone()))?;

        let api_latency_seconds = HistogramVec::new(
            HistogramOpts::new("goldroute_api_latency_seconds", "API request latency in seconds").buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["path"],
        )?;
        registry.register(Box::new(api_latency_seconds.clone()))?;

        let audit_records_total = Gauge::with_opts(Opts::new("goldroute_audit_records_total", "Total audit records appended"))?;
        registry.register(Box::new(audit_records_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            started_at: Instant::now(),
            portfolio_total_grams,
            venue_health,
            venue_error_rate,
            circuit_breaker_open,
            orders_total,
            api_requests_total,
            api_latency_seconds,
            audit_records_total,
        })
    }

    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families).unwrap_or_default()
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    pub fn record_api_request(&self, path: &str, status: u16, latency_secs: f64) {
        self.api_requests_total.with_label_values(&[path, &status.to_string()]).inc();
        self.api_latency_seconds.with_label_values(&[path]).observe(latency_secs);
    }

    pub fn record_order(&self, side: &str, status: &str) {
        self.orders_total.with_label_values(&[side, status]).inc();
    }

    pub fn set_venue_health(&self, venue_id: &str, value: f64) {
        self.venue_health.with_label_values(&[venue_id]).set(value);
    }

    pub fn set_venue_error_rate(&self, venue_id: &str, value: f64) {
        self.venue_error_rate.with_label_values(&[venue_id]).set(value);
    }

    pub fn set_circuit_breaker_open(&self, venue_id: &str, open: bool) {
        self.circuit_breaker_open.with_label_values(&[venue_id]).set(if open { 1.0 } else { 0.0 });
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("failed to build default Metrics registry")
    }
}
