//! Security Manager: the sole owner of credential material (§3, §5).
//!
//! Every other subsystem receives a short-lived, owned `Credentials` value
//! from `retrieve_credentials` rather than a handle into this store; callers
//! must not copy that value into logs or caches, a usage discipline this
//! type cannot enforce at the type level but documents at the call site.

use super::credentials::{Credentials, assert_no_withdrawal_permission};
use crate::domain::audit::record::{AuditDetails, AuditKind};
use crate::domain::errors::VenueError;
use crate::domain::ports::EventSink;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct SecurityManager {
    store: Mutex<HashMap<String, Credentials>>,
    sink: Arc<dyn EventSink>,
}

impl SecurityManager {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { store: Mutex::new(HashMap::new()), sink }
    }

    /// Rejects and never writes state if the declared permissions assert
    /// withdrawal capability (testable property #7).
    pub async fn store_credentials(&self, credentials: Credentials) -> Result<(), VenueError> {
        if let Err(err) = assert_no_withdrawal_permission(&credentials.permissions) {
            self.sink
                .record(
                    AuditKind::CredStored,
                    AuditDetails::CredentialEvent {
                        venue_id: credentials.venue_id.clone(),
                        permissions: credentials.permissions.clone(),
                        success: false,
                        reason: Some("withdrawal permission present".to_string()),
                    },
                    None,
                    Some(credentials.venue_id.clone()),
                )
                .await;
            return Err(match err {
                VenueError::PermissionError { .. } => VenueError::PermissionError { venue_id: credentials.venue_id },
                other => other,
            });
        }

        let venue_id = credentials.venue_id.clone();
        let permissions = credentials.permissions.clone();
        self.store.lock().await.insert(venue_id.clone(), credentials);
        self.sink
            .record(
                AuditKind::CredStored,
                AuditDetails::CredentialEvent { venue_id: venue_id.clone(), permissions, success: true, reason: None },
                None,
                Some(venue_id),
            )
            .await;
        Ok(())
    }

    /// Returns an owned copy of the stored credentials for immediate use in
    /// one authenticated call; `NOT_FOUND` if nothing is stored for the venue
    /// (including after a rejected `store_credentials`, see S5).
    pub async fn retrieve_credentials(&self, venue_id: &str) -> Result<Credentials, VenueError> {
        let store = self.store.lock().await;
        let credentials = store.get(venue_id).cloned().ok_or_else(|| VenueError::NotFound { resource: "credentials".into(), id: venue_id.to_string() })?;
        drop(store);
        self.sink
            .record(
                AuditKind::CredRetrieved,
                AuditDetails::CredentialEvent { venue_id: venue_id.to_string(), permissions: credentials.permissions.clone(), success: true, reason: None },
                None,
                Some(venue_id.to_string()),
            )
            .await;
        Ok(credentials)
    }

    /// Rotates credentials in place, subject to the same permission gate as
    /// initial storage. The prior credentials are retained if rejected.
    pub async fn rotate_credentials(&self, credentials: Credentials) -> Result<(), VenueError> {
        assert_no_withdrawal_permission(&credentials.permissions).map_err(|_| VenueError::PermissionError { venue_id: credentials.venue_id.clone() })?;
        let venue_id = credentials.venue_id.clone();
        let permissions = credentials.permissions.clone();
        self.store.lock().await.insert(venue_id.clone(), credentials);
        self.sink
            .record(
                AuditKind::CredRotated,
                AuditDetails::CredentialEvent { venue_id: venue_id.clone(), permissions, success: true, reason: None },
                None,
                Some(venue_id),
            )
            .await;
        Ok(())
    }

    /// Wipes any stored credentials for `venue_id`. Idempotent.
    pub async fn disconnect(&self, venue_id: &str) {
        self.store.lock().await.remove(venue_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::journal::AuditJournal;

    fn creds(venue_id: &str, perms: &[&str]) -> Credentials {
        Credentials { venue_id: venue_id.into(), key: "key".into(), secret: "secret".into(), permissions: perms.iter().map(|s| s.to_string()).collect() }
    }

    #[tokio::test]
    async fn withdrawal_capable_credentials_are_rejected_and_never_stored() {
        let journal = Arc::new(AuditJournal::new());
        let manager = SecurityManager::new(journal.clone());
        let result = manager.store_credentials(creds("bitfinex", &["trade", "withdraw"])).await;
        assert!(matches!(result, Err(VenueError::PermissionError { .. })));

        let retrieved = manager.retrieve_credentials("bitfinex").await;
        assert!(matches!(retrieved, Err(VenueError::NotFound { .. })));
    }

    #[tokio::test]
    async fn valid_credentials_round_trip() {
        let journal = Arc::new(AuditJournal::new());
        let manager = SecurityManager::new(journal);
        manager.store_credentials(creds("bitfinex", &["trade", "read"])).await.unwrap();
        let retrieved = manager.retrieve_credentials("bitfinex").await.unwrap();
        assert_eq!(retrieved.venue_id, "bitfinex");
    }

    #[tokio::test]
    async fn disconnect_wipes_stored_credentials() {
        let journal = Arc::new(AuditJournal::new());
        let manager = SecurityManager::new(journal);
        manager.store_credentials(creds("bitfinex", &["trade"])).await.unwrap();
        manager.disconnect("bitfinex").await;
        assert!(manager.retrieve_credentials("bitfinex").await.is_err());
    }
}
