//! Minimal JSON-RPC client over the `HttpClient` transport seam.

use crate::domain::errors::VenueError;
use crate::infrastructure::core::http_client_factory::HttpClient;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct JsonRpcClient {
    url: String,
    http: Arc<dyn HttpClient>,
    venue_id: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, http: Arc<dyn HttpClient>, venue_id: impl Into<String>) -> Self {
        Self { url: url.into(), http, venue_id: venue_id.into(), next_id: AtomicU64::new(1) }
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value, VenueError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let body = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});

        let response = self
            .http
            .post_json(&self.url, HashMap::new(), body)
            .await
            .map_err(|reason| VenueError::NetworkError { venue_id: self.venue_id.clone(), reason })?;

        if response.status != 200 {
            return Err(VenueError::VenueFault { venue_id: self.venue_id.clone(), reason: format!("rpc transport status {}", response.status) });
        }
        if let Some(error) = response.body.get("error") {
            let message = error.get("message").and_then(Value::as_str).unwrap_or("rpc error").to_string();
            return Err(VenueError::VenueFault { venue_id: self.venue_id.clone(), reason: message });
        }
        response.body.get("result").cloned().ok_or_else(|| VenueError::Internal { reason: "rpc response missing result".into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::core::http_client_factory::test_support::FakeHttpClient;

    #[tokio::test]
    async fn propagates_the_result_field() {
        let http = Arc::new(FakeHttpClient::new(vec![(200, json!({"jsonrpc": "2.0", "id": 1, "result": "0x10"}))]));
        let client = JsonRpcClient::new("http://node", http, "ethereum");
        let result = client.call("eth_blockNumber", json!([])).await.unwrap();
        assert_eq!(result, "0x10");
    }

    #[tokio::test]
    async fn maps_an_rpc_error_object_to_a_venue_fault() {
        let http = Arc::new(FakeHttpClient::new(vec![(200, json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "execution reverted"}}))]));
        let client = JsonRpcClient::new("http://node", http, "ethereum");
        let result = client.call("eth_call", json!([])).await;
        assert!(matches!(result, Err(VenueError::VenueFault { .. })));
    }
}
