//! HMAC-SHA384 request signing for the reference exchange adapter.
//!
//! Headers carry the API key, a base64-encoded JSON payload (including a
//! monotonic nonce), and a hex HMAC-SHA384 signature over that payload
//! (§4.1, §6). The signature and the secret that produced it never appear
//! in any returned error message.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha384;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

type HmacSha384 = Hmac<Sha384>;

/// Strictly-increasing nonce source, seeded from wall-clock microseconds so
/// restarts never reuse a prior process's nonce value.
pub struct NonceSource {
    counter: AtomicU64,
}

impl NonceSource {
    pub fn new() -> Self {
        let seed = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_micros() as u64).unwrap_or(0);
        Self { counter: AtomicU64::new(seed) }
    }

    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for NonceSource {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SignedRequest {
    pub headers: HashMap<String, String>,
    pub body: Value,
}

/// Builds the `X-BFX-APIKEY` / `X-BFX-PAYLOAD` / `X-BFX-SIGNATURE` header
/// triple for a request body that already carries its `nonce` field.
pub fn sign_request(api_key: &str, api_secret: &str, mut body: Value, nonce: u64) -> SignedRequest {
    if let Value::Object(map) = &mut body {
        map.insert("nonce".to_string(), Value::String(nonce.to_string()));
    }
    let payload = BASE64.encode(serde_json::to_vec(&body).expect("request body always serializes"));

    let mut mac = HmacSha384::new_from_slice(api_secret.as_bytes()).expect("HMAC accepts a key of any size");
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    let mut headers = HashMap::new();
    headers.insert("X-BFX-APIKEY".to_string(), api_key.to_string());
    headers.insert("X-BFX-PAYLOAD".to_string(), payload);
    headers.insert("X-BFX-SIGNATURE".to_string(), signature);

    SignedRequest { headers, body }
}
