//! Reference exchange adapter (Bitfinex-shaped), implementing
//! `ExchangeVenue` over authenticated HTTP with HMAC-SHA384 signing.

use super::signing::{NonceSource, sign_request};
use super::status::map_order_status;
use super::symbols::{to_external, to_internal};
use crate::domain::errors::VenueError;
use crate::domain::order_book::OrderBook;
use crate::domain::ports::{ExchangeVenue, HealthReport, PlaceOrderParams, VenueOrderStatus};
use crate::domain::security::credentials::Credentials;
use crate::domain::types::{Fill, Holding, OrderSide};
use crate::infrastructure::core::http_client_factory::{HttpClient, HttpResponse};
use crate::infrastructure::core::reliability_envelope::ReliabilityEnvelope;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

struct Session {
    credentials: Arc<Credentials>,
}

pub struct BitfinexExchange {
    venue_id: String,
    base_url: String,
    http: Arc<dyn HttpClient>,
    envelope: Arc<ReliabilityEnvelope>,
    nonce: NonceSource,
    session: RwLock<Option<Session>>,
}

impl BitfinexExchange {
    pub fn new(venue_id: impl Into<String>, base_url: impl Into<String>, http: Arc<dyn HttpClient>, envelope: Arc<ReliabilityEnvelope>) -> Self {
        Self { venue_id: venue_id.into(), base_url: base_url.into(), http, envelope, nonce: NonceSource::new(), session: RwLock::new(None) }
    }

    pub async fn disconnect(&self) {
        *self.session.write().await = None;
    }

    fn map_http_error(&self, status: u16, body: &Value) -> VenueError {
        let message = body.get("message").and_then(Value::as_str).unwrap_or("").to_ascii_lowercase();
        match status {
            401 | 403 => VenueError::AuthError { venue_id: self.venue_id.clone(), reason: "credentials rejected".into() },
            400 if message.contains("insufficient") => VenueError::InsufficientBalance { venue_id: self.venue_id.clone() },
            400 if message.contains("symbol") => VenueError::InvalidSymbol { venue_id: self.venue_id.clone(), symbol: String::new() },
            400 => VenueError::ValidationError { reason: "exchange rejected the request body".into() },
            404 => VenueError::NotFound { resource: "order".into(), id: String::new() },
            429 => VenueError::RateLimitError { venue_id: self.venue_id.clone() },
            500..=599 => VenueError::VenueFault { venue_id: self.venue_id.clone(), reason: format!("upstream status {status}") },
            _ => VenueError::Internal { reason: format!("unclassified upstream status {status}") },
        }
    }

    async fn authenticated_post(&self, path: &str, mut body: Value) -> Result<HttpResponse, VenueError> {
        let session = self.session.read().await;
        let Some(session) = session.as_ref() else {
            return Err(VenueError::AuthError { venue_id: self.venue_id.clone(), reason: "no active session".into() });
        };
        if let Value::Object(map) = &mut body {
            map.insert("request".to_string(), Value::String(path.to_string()));
        }
        let nonce = self.nonce.next();
        let signed = sign_request(&session.credentials.key, &session.credentials.secret, body, nonce);
        self.http
            .post_json(&format!("{}{path}", self.base_url), signed.headers, signed.body)
            .await
            .map_err(|reason| VenueError::NetworkError { venue_id: self.venue_id.clone(), reason })
    }

    async fn public_get(&self, path: &str) -> Result<HttpResponse, VenueError> {
        self.http
            .get_json(&format!("{}{path}", self.base_url), HashMap::new())
            .await
            .map_err(|reason| VenueError::NetworkError { venue_id: self.venue_id.clone(), reason })
    }
}

#[async_trait]
impl ExchangeVenue for BitfinexExchange {
    fn id(&self) -> &str {
        &self.venue_id
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<(), VenueError> {
        let credentials = Arc::new(credentials.clone());
        let probe_credentials = credentials.clone();
        let response = self
            .envelope
            .probe(|| async {
                let nonce = self.nonce.next();
                let signed = sign_request(&probe_credentials.key, &probe_credentials.secret, json!({"request": "/v1/balances"}), nonce);
                self.http
                    .post_json(&format!("{}/v1/balances", self.base_url), signed.headers, signed.body)
                    .await
                    .map_err(|reason| VenueError::NetworkError { venue_id: self.venue_id.clone(), reason })
            })
            .await?;

        if response.status != 200 {
            // Authentication failure must never leave a partial session.
            return Err(self.map_http_error(response.status, &response.body));
        }

        *self.session.write().await = Some(Session { credentials });
        Ok(())
    }

    async fn health_check(&self) -> HealthReport {
        let result = self.envelope.probe(|| self.public_get("/v1/pubticker/xautusd")).await;
        match result {
            Ok(response) if response.status == 200 => HealthReport::Healthy,
            Ok(_) => HealthReport::Degraded,
            Err(_) => self.envelope.health_report().await,
        }
    }

    async fn get_balance(&self, symbol: &str) -> Result<Holding, VenueError> {
        let venue_id = self.venue_id.clone();
        let symbol = symbol.to_string();
        self.envelope
            .guard(|| {
                let symbol = symbol.clone();
                let venue_id = venue_id.clone();
                async move {
                    let response = self.authenticated_post("/v1/balances", json!({})).await?;
                    if response.status != 200 {
                        return Err(self.map_http_error(response.status, &response.body));
                    }
                    let entries = response.body.as_array().cloned().unwrap_or_default();
                    let native = entries
                        .iter()
                        .find(|entry| entry.get("currency").and_then(Value::as_str).map(|c| c.eq_ignore_ascii_case(&symbol)).unwrap_or(false))
                        .and_then(|entry| entry.get("available").and_then(Value::as_str))
                        .and_then(|s| s.parse::<Decimal>().ok())
                        .unwrap_or(Decimal::ZERO);
                    Ok(Holding::new(venue_id.clone(), symbol.clone(), native, Utc::now()))
                }
            })
            .await
    }

    async fn get_order_book(&self, symbol: &str, depth: usize) -> Result<OrderBook, VenueError> {
        let external = to_external(symbol);
        let path = format!("/v1/book/{}?limit_bids={depth}&limit_asks={depth}", external.to_ascii_lowercase());
        self.envelope
            .guard(|| {
                let path = path.clone();
                async move {
                    let response = self.public_get(&path).await?;
                    if response.status != 200 {
                        return Err(self.map_http_error(response.status, &response.body));
                    }
                    let parse_levels = |key: &str| -> Vec<(Decimal, Decimal)> {
                        response
                            .body
                            .get(key)
                            .and_then(Value::as_array)
                            .map(|levels| {
                                levels
                                    .iter()
                                    .filter_map(|l| {
                                        let price = l.get("price")?.as_str()?.parse::<Decimal>().ok()?;
                                        let amount = l.get("amount")?.as_str()?.parse::<Decimal>().ok()?;
                                        Some((price, amount))
                                    })
                                    .collect()
                            })
                            .unwrap_or_default()
                    };
                    Ok(OrderBook::new(parse_levels("bids"), parse_levels("asks")))
                }
            })
            .await
    }

    async fn place_limit_order(&self, params: PlaceOrderParams) -> Result<VenueOrderStatus, VenueError> {
        if params.quantity <= Decimal::ZERO || params.limit_price <= Decimal::ZERO {
            return Err(VenueError::ValidationError { reason: "quantity and limit price must be positive".into() });
        }
        let external_symbol = to_external(&params.symbol);
        let signed_amount = match params.side {
            OrderSide::Buy => params.quantity,
            OrderSide::Sell => -params.quantity,
        };
        self.envelope
            .guard(|| {
                let body = json!({
                    "symbol": external_symbol.to_ascii_lowercase(),
                    "amount": signed_amount.to_string(),
                    "price": params.limit_price.to_string(),
                    "exchange": "bitfinex",
                    "type": "exchange limit",
                });
                async move {
                    let response = self.authenticated_post("/v1/order/new", body).await?;
                    if response.status != 200 {
                        return Err(self.map_http_error(response.status, &response.body));
                    }
                    let venue_order_id = response.body.get("order_id").and_then(Value::as_u64).map(|n| n.to_string()).unwrap_or_default();
                    let status = response.body.get("status").and_then(Value::as_str).unwrap_or("active");
                    Ok(VenueOrderStatus { venue_order_id, status: map_order_status(status), fills: Vec::new() })
                }
            })
            .await
    }

    async fn cancel_order(&self, venue_order_id: &str) -> Result<(), VenueError> {
        self.envelope
            .guard(|| {
                let order_id = venue_order_id.to_string();
                async move {
                    let response = self.authenticated_post("/v1/order/cancel", json!({"order_id": order_id})).await?;
                    if response.status != 200 {
                        return Err(self.map_http_error(response.status, &response.body));
                    }
                    Ok(())
                }
            })
            .await
    }

    async fn get_order_status(&self, venue_order_id: &str) -> Result<VenueOrderStatus, VenueError> {
        self.envelope
            .guard(|| {
                let order_id = venue_order_id.to_string();
                async move {
                    let response = self.authenticated_post("/v1/order/status", json!({"order_id": order_id})).await?;
                    if response.status != 200 {
                        return Err(self.map_http_error(response.status, &response.body));
                    }
                    let status = response.body.get("status").and_then(Value::as_str).unwrap_or("active");
                    let fills = response
                        .body
                        .get("fills")
                        .and_then(Value::as_array)
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(|f| {
                                    Some(Fill {
                                        fill_id: f.get("fill_id")?.as_str()?.to_string(),
                                        order_id: order_id.clone(),
                                        quantity: f.get("quantity")?.as_str()?.parse().ok()?,
                                        price: f.get("price")?.as_str()?.parse().ok()?,
                                        fees: f.get("fees").and_then(Value::as_str).and_then(|s| s.parse().ok()).unwrap_or(Decimal::ZERO),
                                        timestamp: Utc::now(),
                                    })
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    Ok(VenueOrderStatus { venue_order_id: order_id.clone(), status: map_order_status(status), fills })
                }
            })
            .await
    }

    async fn latency_hint(&self) -> std::time::Duration {
        self.envelope.last_latency().await.unwrap_or_default()
    }

    async fn error_rate_hint(&self) -> f64 {
        self.envelope.error_rate().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::core::http_client_factory::test_support::FakeHttpClient;
    use crate::infrastructure::core::reliability_envelope::EnvelopeConfig;
    use std::time::Duration;

    fn envelope() -> Arc<ReliabilityEnvelope> {
        Arc::new(ReliabilityEnvelope::new(
            "bitfinex",
            EnvelopeConfig {
                requests_per_second: 1000.0,
                burst_size: 100,
                rate_limit_max_wait: Duration::from_millis(50),
                failure_threshold: 5,
                recovery_timeout: Duration::from_millis(50),
                monitoring_period: Duration::from_secs(300),
                max_retries: 1,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                backoff_multiplier: 2.0,
            },
        ))
    }

    fn credentials() -> Credentials {
        Credentials { venue_id: "bitfinex".into(), key: "key".into(), secret: "secret".into(), permissions: vec!["trade".into(), "read".into()] }
    }

    #[tokio::test]
    async fn authenticate_succeeds_on_200_and_caches_a_session() {
        let http = Arc::new(FakeHttpClient::new(vec![(200, json!([]))]));
        let adapter = BitfinexExchange::new("bitfinex", "https://api.bitfinex.com", http, envelope());
        assert!(adapter.authenticate(&credentials()).await.is_ok());
        assert!(adapter.session.read().await.is_some());
    }

    #[tokio::test]
    async fn authenticate_failure_leaves_no_session() {
        let http = Arc::new(FakeHttpClient::new(vec![(401, json!({"message": "invalid key"}))]));
        let adapter = BitfinexExchange::new("bitfinex", "https://api.bitfinex.com", http, envelope());
        let result = adapter.authenticate(&credentials()).await;
        assert!(matches!(result, Err(VenueError::AuthError { .. })));
        assert!(adapter.session.read().await.is_none());
    }

    #[tokio::test]
    async fn get_balance_without_session_is_an_auth_error() {
        let http = Arc::new(FakeHttpClient::new(vec![]));
        let adapter = BitfinexExchange::new("bitfinex", "https://api.bitfinex.com", http, envelope());
        let result = adapter.get_balance("XAUT").await;
        assert!(matches!(result, Err(VenueError::AuthError { .. })));
    }

    #[tokio::test]
    async fn get_balance_parses_matching_currency_entry() {
        let http = Arc::new(FakeHttpClient::new(vec![
            (200, json!([])), // authenticate
            (200, json!([{"currency": "XAUT", "available": "2.5"}])), // get_balance
        ]));
        let adapter = BitfinexExchange::new("bitfinex", "https://api.bitfinex.com", http, envelope());
        adapter.authenticate(&credentials()).await.unwrap();
        let holding = adapter.get_balance("XAUT").await.unwrap();
        assert_eq!(holding.native, Decimal::new(25, 1));
        assert_eq!(holding.grams, Decimal::new(25, 1) * crate::domain::types::TROY_OUNCE_TO_GRAM);
    }

    #[tokio::test]
    async fn place_limit_order_rejects_non_positive_quantity() {
        let http = Arc::new(FakeHttpClient::new(vec![]));
        let adapter = BitfinexExchange::new("bitfinex", "https://api.bitfinex.com", http, envelope());
        let params = PlaceOrderParams { symbol: "XAUT/USD".into(), side: OrderSide::Buy, quantity: Decimal::ZERO, limit_price: Decimal::new(2000, 0) };
        let result = adapter.place_limit_order(params).await;
        assert!(matches!(result, Err(VenueError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn disconnect_wipes_the_cached_session() {
        let http = Arc::new(FakeHttpClient::new(vec![(200, json!([]))]));
        let adapter = BitfinexExchange::new("bitfinex", "https://api.bitfinex.com", http, envelope());
        adapter.authenticate(&credentials()).await.unwrap();
        adapter.disconnect().await;
        assert!(adapter.session.read().await.is_none());
    }
}
