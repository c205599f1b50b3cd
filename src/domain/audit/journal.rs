//! Append-only, hash-chained audit journal.
//!
//! Kept in-memory (a `Vec<AuditRecord>` behind a mutex) rather than persisted
//! to disk: the hash-chain bytes hashed here are already exactly the bytes
//! that would be written to an append-only file, so adding durability later
//! is additive, not a rewrite.

use super::record::{AuditDetails, AuditKind, AuditRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Mutex;
use unicode_normalization::UnicodeNormalization;

use crate::domain::ports::EventSink;

const ZERO_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000";

fn nfc(s: &str) -> String {
    s.nfc().collect()
}

/// Canonical serialization for hashing: sorted keys (via `serde_json::Map`'s
/// `BTreeMap` backing), NFC-normalized strings, stable field order.
fn canonical_bytes(
    seq: u64,
    prev_hash: &str,
    timestamp: &DateTime<Utc>,
    kind: AuditKind,
    venue_id: &Option<String>,
    subject: &Option<String>,
    redacted_details: &Value,
) -> Vec<u8> {
    let normalized_details = normalize_strings(redacted_details);
    let envelope = serde_json::json!({
        "seq": seq,
        "prev_hash": nfc(prev_hash),
        "timestamp": timestamp.to_rfc3339(),
        "kind": serde_json::to_value(kind).unwrap(),
        "venue_id": venue_id.as_ref().map(|s| nfc(s)),
        "subject": subject.as_ref().map(|s| nfc(s)),
        "details": normalized_details,
    });
    // serde_json's default `Map` is a `BTreeMap`, so object keys serialize
    // in lexicographic order without any extra sorting step here.
    serde_json::to_vec(&envelope).expect("canonical envelope always serializes")
}

fn normalize_strings(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(nfc(s)),
        Value::Array(items) => Value::Array(items.iter().map(normalize_strings).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (nfc(k), normalize_strings(v))).collect()),
        other => other.clone(),
    }
}

fn hash_record(
    seq: u64,
    prev_hash: &str,
    timestamp: &DateTime<Utc>,
    kind: AuditKind,
    venue_id: &Option<String>,
    subject: &Option<String>,
    redacted_details: &Value,
) -> String {
    let bytes = canonical_bytes(seq, prev_hash, timestamp, kind, venue_id, subject, redacted_details);
    let digest = Sha256::digest(&bytes);
    hex::encode(digest)
}

pub struct AuditJournal {
    records: Mutex<Vec<AuditRecord>>,
}

impl AuditJournal {
    pub fn new() -> Self {
        Self { records: Mutex::new(Vec::new()) }
    }

    /// Appends a new record to the chain, returning its sequence number.
    pub fn append(
        &self,
        kind: AuditKind,
        details: AuditDetails,
        subject: Option<String>,
        venue_id: Option<String>,
    ) -> u64 {
        let mut records = self.records.lock().expect("audit journal mutex poisoned");
        let seq = records.len() as u64 + 1;
        let prev_hash = records.last().map(|r| r.record_hash.clone()).unwrap_or_else(|| ZERO_HASH.to_string());
        let timestamp = Utc::now();
        let redacted = details.redacted();
        let record_hash = hash_record(seq, &prev_hash, &timestamp, kind, &venue_id, &subject, &redacted);

        records.push(AuditRecord {
            seq,
            kind,
            timestamp,
            venue_id,
            subject,
            details: redacted,
            prev_hash,
            record_hash,
        });
        seq
    }

    /// Records whose `timestamp ∈ [from, to]`, ordered by `seq` ascending.
    pub fn export(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Vec<AuditRecord> {
        let records = self.records.lock().expect("audit journal mutex poisoned");
        records
            .iter()
            .filter(|r| from.is_none_or(|f| r.timestamp >= f))
            .filter(|r| to.is_none_or(|t| r.timestamp <= t))
            .cloned()
            .collect()
    }

    /// Recomputes the chain from seq=1 forward. False on any hash mismatch,
    /// sequence gap, or non-monotonic timestamp.
    pub fn verify_integrity(&self) -> bool {
        let records = self.records.lock().expect("audit journal mutex poisoned");
        let mut expected_prev = ZERO_HASH.to_string();
        let mut last_timestamp: Option<DateTime<Utc>> = None;

        for (idx, record) in records.iter().enumerate() {
            if record.seq != idx as u64 + 1 {
                return false;
            }
            if record.prev_hash != expected_prev {
                return false;
            }
            if let Some(last) = last_timestamp {
                if record.timestamp < last {
                    return false;
                }
            }
            let recomputed = hash_record(
                record.seq,
                &record.prev_hash,
                &record.timestamp,
                record.kind,
                &record.venue_id,
                &record.subject,
                &record.details,
            );
            if recomputed != record.record_hash {
                return false;
            }
            expected_prev = record.record_hash.clone();
            last_timestamp = Some(record.timestamp);
        }
        true
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("audit journal mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuditJournal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for AuditJournal {
    async fn record(&self, kind: AuditKind, details: AuditDetails, subject: Option<String>, venue_id: Option<String>) {
        self.append(kind, details, subject, venue_id);
    }
}
