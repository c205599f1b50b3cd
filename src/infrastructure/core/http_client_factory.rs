//! HTTP transport seam every adapter depends on.
//!
//! Adapters hold a `Arc<dyn HttpClient>` rather than a `reqwest::Client`
//! directly, so tests can substitute a deterministic fake transport without
//! touching production wiring (§9). `HttpClientFactory` builds the
//! production implementation on top of `reqwest`/`reqwest-middleware` with
//! the same retry-transient-middleware shape this repository uses
//! elsewhere, though the routing layer's own retry policy (§4.1) is what
//! actually governs venue-call retries; the middleware here only guards
//! against raw transport hiccups below that layer.

use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

/// Narrow capability adapters depend on instead of `reqwest::Client`
/// directly. JSON-RPC calls also route through `post_json`.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get_json(&self, url: &str, headers: HashMap<String, String>) -> Result<HttpResponse, String>;
    async fn post_json(&self, url: &str, headers: HashMap<String, String>, body: Value) -> Result<HttpResponse, String>;
}

pub struct ReqwestHttpClient {
    client: ClientWithMiddleware,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self { client: HttpClientFactory::create_client() }
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get_json(&self, url: &str, headers: HashMap<String, String>) -> Result<HttpResponse, String> {
        let mut req = self.client.get(url);
        for (k, v) in headers {
            req = req.header(k, v);
        }
        let response = req.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        Ok(HttpResponse { status, body })
    }

    async fn post_json(&self, url: &str, headers: HashMap<String, String>, body: Value) -> Result<HttpResponse, String> {
        let mut req = self.client.post(url).json(&body);
        for (k, v) in headers {
            req = req.header(k, v);
        }
        let response = req.send().await.map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        Ok(HttpResponse { status, body })
    }
}

pub struct HttpClientFactory;

impl HttpClientFactory {
    /// Builds a client with exponential-backoff retry middleware for
    /// transient transport failures (connection resets, DNS hiccups).
    pub fn create_client() -> ClientWithMiddleware {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

        let client = Client::builder()
            .pool_max_idle_per_host(5)
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());

        ClientBuilder::new(client).with(RetryTransientMiddleware::new_with_policy(retry_policy)).build()
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::sync::Mutex;

    /// Deterministic fake transport for adapter unit tests: returns
    /// canned `(status, body)` pairs in call order.
    pub struct FakeHttpClient {
        responses: Mutex<std::collections::VecDeque<HttpResponse>>,
        pub requests: Mutex<Vec<(String, Value)>>,
    }

    impl FakeHttpClient {
        pub fn new(responses: Vec<(u16, Value)>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().map(|(status, body)| HttpResponse { status, body }).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn next(&self, url: &str, body: Value) -> Result<HttpResponse, String> {
            self.requests.lock().unwrap().push((url.to_string(), body));
            self.responses.lock().unwrap().pop_front().ok_or_else(|| "no more fake responses queued".to_string())
        }
    }

    #[async_trait]
    impl HttpClient for FakeHttpClient {
        async fn get_json(&self, url: &str, _headers: HashMap<String, String>) -> Result<HttpResponse, String> {
            self.next(url, Value::Null)
        }

        async fn post_json(&self, url: &str, _headers: HashMap<String, String>, body: Value) -> Result<HttpResponse, String> {
            self.next(url, body)
        }
    }
}
