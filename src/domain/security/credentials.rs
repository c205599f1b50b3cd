//! Credential material and the withdrawal-permission gate.
//!
//! The Security Manager (`domain::security::manager::SecurityManager`) is the
//! only subsystem that holds ciphertext; every other caller receives a short-lived
//! borrowed view that must never be copied into logs or caches.

use crate::domain::errors::VenueError;

/// Declared, caller-asserted permission facts for stored credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub venue_id: String,
    pub key: String,
    pub secret: String,
    pub permissions: Vec<String>,
}

/// Rejects storage if the declared permission set asserts withdrawal
/// capability anywhere (case-insensitive substring match on `"withdraw"`).
///
/// There is no live introspection of the venue's own permission bits: the
/// caller-declared list is treated as authoritative, matching the reference
/// exchange adapter's posture of only checking that account info is
/// accessible.
pub fn assert_no_withdrawal_permission(permissions: &[String]) -> Result<(), VenueError> {
    let has_withdraw = permissions.iter().any(|p| p.to_ascii_lowercase().contains("withdraw"));
    if has_withdraw {
        return Err(VenueError::PermissionError { venue_id: String::new() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_any_permission_containing_withdraw() {
        let perms = vec!["trade".to_string(), "Withdraw".to_string()];
        assert!(assert_no_withdrawal_permission(&perms).is_err());
    }

    #[test]
    fn accepts_trade_and_read_only_permissions() {
        let perms = vec!["trade".to_string(), "read".to_string(), "no-withdraw".to_string()];
        assert!(assert_no_withdrawal_permission(&perms).is_ok());
    }
}
