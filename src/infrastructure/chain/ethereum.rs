//! Reference chain adapter (Ethereum-shaped, ERC-20), implementing
//! `ChainVenue` over a JSON-RPC transport.

use super::validation::{validate_address, validate_tx_hash};
use crate::domain::errors::VenueError;
use crate::domain::ports::{ChainVenue, ConfirmationStatus, HealthReport};
use crate::domain::security::credentials::Credentials;
use crate::domain::types::{Holding, TransferObservation};
use crate::infrastructure::chain::erc20_abi::{
    BALANCE_OF_SELECTOR, DECIMALS_SELECTOR, NAME_SELECTOR, SYMBOL_SELECTOR, TRANSFER_EVENT_TOPIC, decode_string, decode_u64, decode_uint256,
    encode_address_arg, encode_no_args, to_native_amount,
};
use crate::infrastructure::chain::rpc_client::JsonRpcClient;
use crate::infrastructure::core::reliability_envelope::ReliabilityEnvelope;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const MAX_BLOCK_WINDOW: u64 = 1000;
const HEAD_DRIFT_TOLERANCE_BLOCKS: i64 = 100;
const TOKEN_CACHE_TTL: Duration = Duration::from_secs(3600);
const TOKEN_CACHE_MAX_ENTRIES: usize = 256;

#[derive(Debug, Clone)]
struct TokenMetadata {
    symbol: String,
    decimals: u32,
    #[allow(dead_code)]
    name: String,
}

struct CachedToken {
    metadata: TokenMetadata,
    cached_at: Instant,
}

pub struct EthereumChain {
    venue_id: String,
    rpc: JsonRpcClient,
    envelope: ReliabilityEnvelope,
    block_time_secs: u64,
    confirmation_threshold: AtomicU64,
    genesis_observed: Instant,
    genesis_block: AtomicU64,
    token_cache: Mutex<HashMap<String, CachedToken>>,
    last_seen_block: Mutex<HashMap<(String, String), u64>>,
}

fn parse_hex_block(value: &Value) -> Result<u64, VenueError> {
    value
        .as_str()
        .and_then(decode_u64)
        .ok_or_else(|| VenueError::Internal { reason: "rpc result is not a hex quantity".into() })
}

impl EthereumChain {
    pub fn new(venue_id: impl Into<String>, rpc_url: impl Into<String>, http: std::sync::Arc<dyn crate::infrastructure::core::http_client_factory::HttpClient>, envelope: ReliabilityEnvelope, block_time_secs: u64, confirmation_threshold: u64) -> Self {
        let venue_id = venue_id.into();
        Self {
            rpc: JsonRpcClient::new(rpc_url, http, venue_id.clone()),
            envelope,
            block_time_secs,
            confirmation_threshold: AtomicU64::new(confirmation_threshold.max(1)),
            genesis_observed: Instant::now(),
            genesis_block: AtomicU64::new(0),
            token_cache: Mutex::new(HashMap::new()),
            last_seen_block: Mutex::new(HashMap::new()),
            venue_id,
        }
    }

    async fn current_block(&self) -> Result<u64, VenueError> {
        let result = self.rpc.call("eth_blockNumber", json!([])).await?;
        parse_hex_block(&result)
    }

    async fn eth_call(&self, to: &str, data: String) -> Result<Value, VenueError> {
        self.rpc.call("eth_call", json!([{"to": to, "data": data}, "latest"])).await
    }

    async fn token_metadata(&self, token_contract: &str) -> Result<TokenMetadata, VenueError> {
        {
            let mut cache = self.token_cache.lock().await;
            cache.retain(|_, entry| entry.cached_at.elapsed() < TOKEN_CACHE_TTL);
            if let Some(entry) = cache.get(token_contract) {
                return Ok(entry.metadata.clone());
            }
        }

        let symbol_raw = self.eth_call(token_contract, encode_no_args(SYMBOL_SELECTOR)).await?;
        let decimals_raw = self.eth_call(token_contract, encode_no_args(DECIMALS_SELECTOR)).await?;
        let name_raw = self.eth_call(token_contract, encode_no_args(NAME_SELECTOR)).await?;

        let symbol = symbol_raw.as_str().and_then(decode_string).ok_or_else(|| VenueError::Internal { reason: "could not decode token symbol".into() })?;
        let decimals = decimals_raw.as_str().and_then(decode_u64).unwrap_or(18) as u32;
        let name = name_raw.as_str().and_then(decode_string).unwrap_or_default();

        let metadata = TokenMetadata { symbol, decimals, name };
        let mut cache = self.token_cache.lock().await;
        if cache.len() >= TOKEN_CACHE_MAX_ENTRIES {
            if let Some(oldest) = cache.iter().min_by_key(|(_, v)| v.cached_at).map(|(k, _)| k.clone()) {
                cache.remove(&oldest);
            }
        }
        cache.insert(token_contract.to_string(), CachedToken { metadata: metadata.clone(), cached_at: Instant::now() });
        Ok(metadata)
    }
}

#[async_trait]
impl ChainVenue for EthereumChain {
    fn id(&self) -> &str {
        &self.venue_id
    }

    /// On-chain trackers have no session to authenticate; this verifies RPC
    /// reachability instead, so a misconfigured node is caught at the same
    /// call site an exchange's credential check would be.
    async fn authenticate(&self, _credentials: &Credentials) -> Result<(), VenueError> {
        let venue_id = self.venue_id.clone();
        self.envelope
            .guard(|| async {
                let block = self.current_block().await?;
                if block == 0 {
                    return Err(VenueError::AuthError { venue_id: venue_id.clone(), reason: "rpc endpoint reports block 0".into() });
                }
                self.genesis_block.store(block, Ordering::SeqCst);
                Ok(())
            })
            .await
    }

    async fn health_check(&self) -> HealthReport {
        let result = self.envelope.probe(|| self.current_block()).await;
        match result {
            Ok(block) if block == 0 => HealthReport::Offline,
            Ok(block) => {
                let genesis = self.genesis_block.load(Ordering::SeqCst);
                if genesis == 0 {
                    self.genesis_block.store(block, Ordering::SeqCst);
                    return HealthReport::Healthy;
                }
                let elapsed_secs = self.genesis_observed.elapsed().as_secs();
                let expected_head = genesis + elapsed_secs / self.block_time_secs.max(1);
                let drift = (block as i64) - (expected_head as i64);
                if drift.abs() > HEAD_DRIFT_TOLERANCE_BLOCKS { HealthReport::Degraded } else { HealthReport::Healthy }
            }
            Err(_) => self.envelope.health_report().await,
        }
    }

    async fn get_balance(&self, address: &str, token_contract: &str) -> Result<Holding, VenueError> {
        validate_address(address)?;
        validate_address(token_contract)?;
        let venue_id = self.venue_id.clone();
        self.envelope
            .guard(|| async {
                let metadata = self.token_metadata(token_contract).await?;
                let raw_hex = self.eth_call(token_contract, encode_address_arg(BALANCE_OF_SELECTOR, address)).await?;
                let raw = raw_hex.as_str().and_then(decode_uint256).unwrap_or(Decimal::ZERO);
                let native = to_native_amount(raw, metadata.decimals);
                Ok(Holding::new(venue_id.clone(), metadata.symbol.clone(), native, Utc::now()))
            })
            .await
    }

    async fn track_transfers(&self, address: &str, token_contract: &str) -> Result<Vec<TransferObservation>, VenueError> {
        validate_address(address)?;
        validate_address(token_contract)?;
        let metadata = self.token_metadata(token_contract).await?;
        let key = (address.to_ascii_lowercase(), token_contract.to_ascii_lowercase());

        self.envelope
            .guard(|| async {
                let current_block = self.current_block().await?;
                let last_seen = *self.last_seen_block.lock().await.get(&key).unwrap_or(&0);
                let from_block = last_seen.max(current_block.saturating_sub(MAX_BLOCK_WINDOW));

                let padded_address = format!("0x{:0>64}", address.trim_start_matches("0x").to_ascii_lowercase());
                let logs = self
                    .rpc
                    .call(
                        "eth_getLogs",
                        json!([{
                            "address": token_contract,
                            "topics": [TRANSFER_EVENT_TOPIC, Value::Null, padded_address],
                            "fromBlock": format!("0x{from_block:x}"),
                            "toBlock": format!("0x{current_block:x}"),
                        }]),
                    )
                    .await?;

                let mut observations = Vec::new();
                for log in logs.as_array().cloned().unwrap_or_default() {
                    let Some(topics) = log.get("topics").and_then(Value::as_array) else { continue };
                    if topics.len() < 3 {
                        continue;
                    }
                    let from = topics[1].as_str().map(|t| format!("0x{}", &t[26..])).unwrap_or_default();
                    let to = topics[2].as_str().map(|t| format!("0x{}", &t[26..])).unwrap_or_default();
                    let amount_raw = log.get("data").and_then(Value::as_str).and_then(decode_uint256).unwrap_or(Decimal::ZERO);
                    let amount = to_native_amount(amount_raw, metadata.decimals);
                    let block_height = log.get("blockNumber").and_then(Value::as_str).and_then(decode_u64).unwrap_or(current_block);
                    let tx_hash = log.get("transactionHash").and_then(Value::as_str).unwrap_or_default().to_string();

                    observations.push(TransferObservation {
                        tx_hash,
                        block_height,
                        from,
                        to,
                        amount,
                        token: metadata.symbol.clone(),
                        observed_at: Utc::now(),
                        confirmations: (current_block.saturating_sub(block_height) + 1),
                    });
                }

                self.last_seen_block.lock().await.insert(key.clone(), current_block);
                Ok(observations)
            })
            .await
    }

    async fn get_confirmation_status(&self, tx_hash: &str) -> Result<ConfirmationStatus, VenueError> {
        validate_tx_hash(tx_hash)?;
        let required = self.confirmation_threshold.load(Ordering::SeqCst);
        self.envelope
            .guard(|| async {
                let receipt = self.rpc.call("eth_getTransactionReceipt", json!([tx_hash])).await?;
                if receipt.is_null() {
                    return Err(VenueError::NotFound { resource: "transaction".into(), id: tx_hash.to_string() });
                }
                let receipt_block = receipt.get("blockNumber").and_then(Value::as_str).and_then(decode_u64).ok_or_else(|| VenueError::Internal { reason: "receipt missing blockNumber".into() })?;
                let current_block = self.current_block().await?;
                let confirmations = current_block.saturating_sub(receipt_block) + 1;
                Ok(ConfirmationStatus { confirmations, required, is_confirmed: confirmations >= required })
            })
            .await
    }

    async fn set_confirmation_threshold(&self, n: u64) -> Result<(), VenueError> {
        if n < 1 {
            return Err(VenueError::ValidationError { reason: "confirmation threshold must be at least 1".into() });
        }
        self.confirmation_threshold.store(n, Ordering::SeqCst);
        Ok(())
    }
}
