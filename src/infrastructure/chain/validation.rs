//! Address/hash format validation for the reference chain adapter (§4.1).
//!
//! Validation happens synchronously, before any call enters the reliability
//! envelope: a malformed address must fail with `VALIDATION_ERROR` and zero
//! retries (testable property #9), never a `NETWORK_ERROR` from a doomed
//! RPC round trip.

use crate::domain::errors::VenueError;

fn is_hex(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_hexdigit())
}

/// `^0x[0-9a-fA-F]{40}$`
pub fn validate_address(address: &str) -> Result<(), VenueError> {
    let body = address.strip_prefix("0x").ok_or_else(|| VenueError::ValidationError {
        reason: format!("address {address} is missing the 0x prefix"),
    })?;
    if body.len() == 40 && is_hex(body) {
        Ok(())
    } else {
        Err(VenueError::ValidationError { reason: format!("address {address} is not a 20-byte hex address") })
    }
}

/// `^0x[0-9a-fA-F]{64}$`
pub fn validate_tx_hash(tx_hash: &str) -> Result<(), VenueError> {
    let body = tx_hash.strip_prefix("0x").ok_or_else(|| VenueError::ValidationError {
        reason: format!("tx hash {tx_hash} is missing the 0x prefix"),
    })?;
    if body.len() == 64 && is_hex(body) {
        Ok(())
    } else {
        Err(VenueError::ValidationError { reason: format!("tx hash {tx_hash} is not a 32-byte hex hash") })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_address() {
        assert!(validate_address("0x1111111111111111111111111111111111111111").is_ok());
    }

    #[test]
    fn rejects_short_address() {
        let err = validate_address("0x1234").unwrap_err();
        assert!(matches!(err, VenueError::ValidationError { .. }));
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(validate_address("1111111111111111111111111111111111111111").is_err());
    }

    #[test]
    fn accepts_well_formed_tx_hash() {
        let hash = format!("0x{}", "ab".repeat(32));
        assert!(validate_tx_hash(&hash).is_ok());
    }

    #[test]
    fn rejects_non_hex_tx_hash() {
        let hash = format!("0x{}", "zz".repeat(32));
        assert!(validate_tx_hash(&hash).is_err());
    }
}
