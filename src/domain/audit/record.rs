//! Audit record shape, the tagged `AuditDetails` variants, and redaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    CredStored,
    CredRetrieved,
    CredRotated,
    AuthOk,
    AuthFail,
    OrderPlaced,
    OrderFilled,
    OrderCancelled,
    OrderFailed,
    RiskBlock,
    HealthChange,
    ConfigChange,
    ResilienceAction,
    ApiRequest,
}

const REDACTED: &str = "[REDACTED]";
const SENSITIVE_KEY_SUBSTRINGS: &[&str] = &[
    "password", "secret", "apikey", "privatekey", "token", "key", "credential",
];

fn is_sensitive_key(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    SENSITIVE_KEY_SUBSTRINGS.iter().any(|needle| lower.contains(needle))
}

/// Walks a JSON value, replacing the value of any object key matching the
/// redaction list (case-insensitive substring) with `[REDACTED]`.
pub fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *v = Value::String(REDACTED.to_string());
                } else {
                    redact_value(v);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                redact_value(item);
            }
        }
        _ => {}
    }
}

pub fn redact_map(mut map: Map<String, Value>) -> Map<String, Value> {
    let mut value = Value::Object(map.drain().collect());
    redact_value(&mut value);
    match value {
        Value::Object(m) => m,
        _ => unreachable!(),
    }
}

/// Tagged audit payload per event kind. Known-sensitive fields are redacted
/// structurally by `redacted()`; `Generic` is the substring-match backstop
/// for events without a dedicated variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuditDetails {
    CredentialEvent {
        venue_id: String,
        permissions: Vec<String>,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    AuthEvent {
        venue_id: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    OrderEvent {
        order_id: String,
        venue_id: String,
        symbol: String,
        side: String,
        quantity: String,
        limit_price: String,
        status: String,
    },
    RiskBlockEvent {
        stage: String,
        reason: String,
        symbol: String,
    },
    HealthChangeEvent {
        venue_id: String,
        previous: String,
        current: String,
    },
    ResilienceEvent {
        action: String,
        target: String,
        value: Option<String>,
    },
    Generic(Map<String, Value>),
}

impl AuditDetails {
    /// Returns the redacted form of this payload as canonical JSON.
    pub fn redacted(&self) -> Value {
        match self {
            AuditDetails::CredentialEvent { venue_id, permissions, success, reason } => serde_json::json!({
                "type": "CredentialEvent",
                "venue_id": venue_id,
                "permissions": permissions,
                "success": success,
                "reason": reason,
            }),
            AuditDetails::AuthEvent { venue_id, success, reason } => serde_json::json!({
                "type": "AuthEvent",
                "venue_id": venue_id,
                "success": success,
                "reason": reason,
            }),
            AuditDetails::OrderEvent { order_id, venue_id, symbol, side, quantity, limit_price, status } => serde_json::json!({
                "type": "OrderEvent",
                "order_id": order_id,
                "venue_id": venue_id,
                "symbol": symbol,
                "side": side,
                "quantity": quantity,
                "limit_price": limit_price,
                "status": status,
            }),
            AuditDetails::RiskBlockEvent { stage, reason, symbol } => serde_json::json!({
                "type": "RiskBlockEvent",
                "stage": stage,
                "reason": reason,
                "symbol": symbol,
            }),
            AuditDetails::HealthChangeEvent { venue_id, previous, current } => serde_json::json!({
                "type": "HealthChangeEvent",
                "venue_id": venue_id,
                "previous": previous,
                "current": current,
            }),
            AuditDetails::ResilienceEvent { action, target, value } => serde_json::json!({
                "type": "ResilienceEvent",
                "action": action,
                "target": target,
                "value": value,
            }),
            AuditDetails::Generic(map) => {
                let redacted = redact_map(map.clone());
                let mut value = Value::Object(redacted);
                value.as_object_mut().unwrap().insert("type".to_string(), Value::String("Generic".to_string()));
                value
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub seq: u64,
    pub kind: AuditKind,
    pub timestamp: DateTime<Utc>,
    pub venue_id: Option<String>,
    pub subject: Option<String>,
    pub details: Value,
    pub prev_hash: String,
    pub record_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redaction_walks_nested_objects_case_insensitively() {
        let mut value = serde_json::json!({
            "ApiKey": "abc123",
            "nested": { "PrivateKey": "def456", "safe": "visible" }
        });
        redact_value(&mut value);
        assert_eq!(value["ApiKey"], "[REDACTED]");
        assert_eq!(value["nested"]["PrivateKey"], "[REDACTED]");
        assert_eq!(value["nested"]["safe"], "visible");
    }

    #[test]
    fn credential_event_redacts_nothing_it_never_carried() {
        let details = AuditDetails::CredentialEvent {
            venue_id: "bitfinex".into(),
            permissions: vec!["trade".into(), "withdraw".into()],
            success: false,
            reason: Some("withdrawal permission present".into()),
        };
        let redacted = details.redacted();
        assert!(redacted.to_string().contains("bitfinex"));
        assert!(!redacted.to_string().to_lowercase().contains("secret"));
    }

    #[test]
    fn generic_backstop_redacts_by_substring() {
        let mut map = Map::new();
        map.insert("user_token".into(), Value::String("shh".into()));
        map.insert("endpoint".into(), Value::String("/orders".into()));
        let details = AuditDetails::Generic(map);
        let redacted = details.redacted();
        assert_eq!(redacted["user_token"], "[REDACTED]");
        assert_eq!(redacted["endpoint"], "/orders");
    }
}
