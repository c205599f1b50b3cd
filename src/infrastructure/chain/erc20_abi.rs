//! Hand-rolled ABI encode/decode for the handful of ERC-20 read calls this
//! adapter needs (`balanceOf`, `decimals`, `symbol`, `name`, the `Transfer`
//! event topic). Selectors are the standard, well-known 4-byte function
//! signatures; no ABI/keccak crate dependency is pulled in for this much
//! surface.

use rust_decimal::Decimal;

pub const BALANCE_OF_SELECTOR: &str = "70a08231";
pub const DECIMALS_SELECTOR: &str = "313ce567";
pub const SYMBOL_SELECTOR: &str = "95d89b41";
pub const NAME_SELECTOR: &str = "06fdde03";
/// `keccak256("Transfer(address,address,uint256)")`.
pub const TRANSFER_EVENT_TOPIC: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

pub fn encode_address_arg(selector: &str, address: &str) -> String {
    let address = address.trim_start_matches("0x");
    format!("0x{selector}{:0>64}", address.to_ascii_lowercase())
}

pub fn encode_no_args(selector: &str) -> String {
    format!("0x{selector}")
}

/// Decodes a single right-aligned `uint256` word, as returned by
/// `balanceOf`/`decimals`.
pub fn decode_uint256(hex_result: &str) -> Option<Decimal> {
    let hex_result = hex_result.trim_start_matches("0x");
    if hex_result.is_empty() {
        return Some(Decimal::ZERO);
    }
    let bytes = hex::decode(hex_result).ok()?;
    let mut value = Decimal::ZERO;
    for byte in bytes {
        value = value * Decimal::from(256) + Decimal::from(byte);
    }
    Some(value)
}

pub fn decode_u64(hex_result: &str) -> Option<u64> {
    let hex_result = hex_result.trim_start_matches("0x");
    u64::from_str_radix(hex_result, 16).ok()
}

/// Decodes the ABI dynamic-`string` encoding (offset word, length word,
/// then the UTF-8 bytes padded to a 32-byte boundary).
pub fn decode_string(hex_result: &str) -> Option<String> {
    let hex_result = hex_result.trim_start_matches("0x");
    let bytes = hex::decode(hex_result).ok()?;
    if bytes.len() < 64 {
        return None;
    }
    let length = u64::from_be_bytes(bytes[56..64].try_into().ok()?) as usize;
    let data_start = 64;
    let data_end = data_start + length;
    let data = bytes.get(data_start..data_end)?;
    String::from_utf8(data.to_vec()).ok()
}

/// Converts a raw `balanceOf` result into a human-scale native amount,
/// dividing by `10^decimals`.
pub fn to_native_amount(raw: Decimal, decimals: u32) -> Decimal {
    let scale = Decimal::from(10u64.pow(decimals.min(18)));
    raw / scale
}
