//! Authorization facade.
//!
//! Coordinates the credential store, the pending-request registry, and the
//! auth-required flags. One instance is constructed at daemon startup and
//! shared with every component that needs authorization.
//!
//! Failures never leak detail across this boundary: every operation
//! reports a boolean or an empty value, and the reason (unknown user,
//! wrong password, store I/O) stays in the logs.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

use crate::config::AuthConfig;
use crate::credentials::{CredentialStore, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USER};
use crate::requests::{
    PendingEntry, PendingRequest, PendingRequestEvent, PendingRequestRegistry, RequesterHandle,
    TokenResponse,
};
use crate::storage::models::TokenRecord;
use crate::storage::{Database, DatabaseError};
use crate::tokens::PasswordHasher;

/// Authorization gates, replaced wholesale on configuration updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthFlags {
    /// Gates remote/non-local authorization checks
    pub auth_required: bool,
    /// Gates local-network administrative operations
    pub local_admin_auth_required: bool,
    /// Gates local-network authorization checks
    pub local_auth_required: bool,
}

impl Default for AuthFlags {
    fn default() -> Self {
        Self {
            auth_required: true,
            local_admin_auth_required: true,
            local_auth_required: false,
        }
    }
}

pub struct AuthManager {
    credentials: CredentialStore,
    events: broadcast::Sender<PendingRequestEvent>,
    flags: RwLock<AuthFlags>,
    installation_id: String,
    pending: Mutex<PendingRequestRegistry>,
    request_timeout: Duration,
}

impl AuthManager {
    /// Build the facade over an opened database.
    ///
    /// Bootstraps the default administrative user and the installation
    /// identity. A store failure here is fatal; the daemon cannot run
    /// without its credential store.
    pub fn new(
        db: Database,
        hasher: Arc<dyn PasswordHasher>,
        config: &AuthConfig,
    ) -> Result<Self, DatabaseError> {
        let credentials = CredentialStore::new(db.clone(), hasher);
        credentials.ensure_default_user()?;

        let installation_id = match db.get_installation_id()? {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                db.put_installation_id(&id)?;
                tracing::info!(id = %id, "Generated installation id");
                id
            }
        };

        let (events, _) = broadcast::channel(16);

        Ok(Self {
            credentials,
            events,
            flags: RwLock::new(AuthFlags::default()),
            installation_id,
            pending: Mutex::new(PendingRequestRegistry::new()),
            request_timeout: Duration::seconds(config.request_timeout_seconds as i64),
        })
    }

    // ========================================================================
    // Flags
    // ========================================================================

    pub fn is_auth_required(&self) -> bool {
        self.flags.read().auth_required
    }

    pub fn is_local_auth_required(&self) -> bool {
        self.flags.read().local_auth_required
    }

    pub fn is_local_admin_auth_required(&self) -> bool {
        self.flags.read().local_admin_auth_required
    }

    pub fn auth_flags(&self) -> AuthFlags {
        *self.flags.read()
    }

    /// Replace the flags wholesale. Written only by the settings observer.
    pub fn replace_flags(&self, flags: AuthFlags) {
        *self.flags.write() = flags;
        tracing::debug!(?flags, "Applied auth flags");
    }

    // ========================================================================
    // Credential checks
    // ========================================================================

    /// True while the administrative account still verifies against the
    /// well-known default password. Used to prompt a mandatory change.
    pub fn has_default_password(&self) -> bool {
        self.is_user_authorized(DEFAULT_ADMIN_USER, DEFAULT_ADMIN_PASSWORD)
    }

    pub fn is_user_authorized(&self, user: &str, password: &str) -> bool {
        match self.credentials.verify_password(user, password) {
            Ok(authorized) => authorized,
            Err(e) => {
                tracing::warn!(error = %e, "Password verification failed");
                false
            }
        }
    }

    pub fn is_token_authorized(&self, token: &str) -> bool {
        match self.credentials.find_by_token(token) {
            Ok(record) => record.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Token verification failed");
                false
            }
        }
    }

    pub fn is_user_token_authorized(&self, user: &str, token: &str) -> bool {
        match self.credentials.find_by_user_and_token(user, token) {
            Ok(record) => record.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Token verification failed");
                false
            }
        }
    }

    pub fn update_user_password(&self, user: &str, old_password: &str, new_password: &str) -> bool {
        match self
            .credentials
            .update_password(user, old_password, new_password)
        {
            Ok(updated) => updated,
            Err(e) => {
                tracing::warn!(error = %e, "Password update failed");
                false
            }
        }
    }

    /// Restore the administrative account to default credentials and
    /// invalidate its tokens.
    pub fn reset_admin_user(&self) -> bool {
        match self.credentials.reset_user(DEFAULT_ADMIN_USER) {
            Ok(reset) => reset,
            Err(e) => {
                tracing::warn!(error = %e, "User reset failed");
                false
            }
        }
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    /// Current token for the user, issued on first access. Make sure the
    /// caller is allowed to see it.
    pub fn get_user_token(&self, user: &str) -> Option<String> {
        let existing = match self.credentials.get_token_for_user(user) {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(error = %e, "Token lookup failed");
                return None;
            }
        };

        if let Some(record) = existing {
            return Some(record.token);
        }

        match self.credentials.set_token(user, "user-token") {
            Ok(record) => Some(record.token),
            Err(e) => {
                tracing::warn!(error = %e, "Token issuance failed");
                None
            }
        }
    }

    /// Issue a token immediately, skipping the request/approval chain.
    /// For trusted first-party callers.
    pub fn create_token(&self, comment: &str) -> Option<TokenRecord> {
        match self.credentials.set_token(DEFAULT_ADMIN_USER, comment) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "Token issuance failed");
                None
            }
        }
    }

    pub fn delete_token(&self, id: &str) -> bool {
        match self.credentials.delete_by_id(id) {
            Ok(deleted) => deleted,
            Err(e) => {
                tracing::warn!(error = %e, "Token deletion failed");
                false
            }
        }
    }

    pub fn get_token_list(&self) -> Vec<TokenRecord> {
        match self.credentials.list_all() {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::warn!(error = %e, "Token listing failed");
                Vec::new()
            }
        }
    }

    // ========================================================================
    // Pending token requests
    // ========================================================================

    /// Register a pending token request under a caller-chosen id and
    /// announce it to subscribed listeners.
    pub fn submit_token_request(&self, handle: RequesterHandle, comment: &str, id: &str) {
        let deadline = Utc::now() + self.request_timeout;
        self.pending.lock().submit(handle, comment, id, deadline);
        tracing::debug!(id = %id, comment = %comment, "New pending token request");

        // No subscribers is fine; the request stays pending either way
        let _ = self.events.send(PendingRequestEvent {
            comment: comment.to_string(),
            id: id.to_string(),
        });
    }

    /// Accept a request: issue a token and inform the requester.
    ///
    /// Returns false when the id is not pending (already resolved, expired,
    /// or never submitted) or when issuance fails after removal.
    pub fn accept_token_request(&self, id: &str) -> bool {
        let entry = match self.pending.lock().resolve(id) {
            Some(entry) => entry,
            None => return false,
        };

        match self.credentials.set_token(DEFAULT_ADMIN_USER, &entry.comment) {
            Ok(record) => {
                Self::respond(entry, true, record.token);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, id = %id, "Token issuance for accepted request failed");
                Self::respond(entry, false, String::new());
                false
            }
        }
    }

    /// Deny a request: inform the requester, no token.
    pub fn deny_token_request(&self, id: &str) -> bool {
        match self.pending.lock().resolve(id) {
            Some(entry) => {
                Self::respond(entry, false, String::new());
                true
            }
            None => false,
        }
    }

    /// Snapshot of the currently pending requests, keyed by id.
    pub fn get_pending_requests(&self) -> HashMap<String, PendingRequest> {
        self.pending.lock().snapshot()
    }

    /// Expire overdue requests, delivering a denial-shaped response for
    /// each. Driven by the periodic sweeper task.
    pub fn sweep_expired_requests(&self) -> usize {
        let expired = self.pending.lock().sweep(Utc::now());
        let count = expired.len();

        for entry in expired {
            tracing::debug!(id = %entry.id, "Pending token request expired");
            Self::respond(entry, false, String::new());
        }

        count
    }

    /// Subscribe to pending-request announcements (administrative UIs).
    pub fn subscribe(&self) -> broadcast::Receiver<PendingRequestEvent> {
        self.events.subscribe()
    }

    fn respond(entry: PendingEntry, success: bool, token: String) {
        let response = TokenResponse {
            comment: entry.comment,
            id: entry.id,
            success,
            token,
        };

        // The requester may have gone away; resolution stands regardless
        if entry.handle.send(response).is_err() {
            tracing::debug!("Token requester gone before resolution was delivered");
        }
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// The persisted installation identifier, generated at first startup.
    pub fn installation_id(&self) -> &str {
        &self.installation_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::DEFAULT_ADMIN_PASSWORD;
    use crate::testutil::{make_manager, make_manager_with_timeout};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_accept_flow() {
        let (manager, _temp) = make_manager();
        let (tx, mut rx) = mpsc::unbounded_channel();

        manager.submit_token_request(tx, "phone", "r1");

        let pending = manager.get_pending_requests();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending["r1"].comment, "phone");

        assert!(manager.accept_token_request("r1"));

        let response = rx.recv().await.unwrap();
        assert!(response.success);
        assert!(!response.token.is_empty());
        assert_eq!(response.comment, "phone");
        assert_eq!(response.id, "r1");

        // The granted token verifies
        assert!(manager.is_token_authorized(&response.token));

        // Entry is gone; second resolution misses
        assert!(manager.get_pending_requests().is_empty());
        assert!(!manager.accept_token_request("r1"));
        assert!(!manager.deny_token_request("r1"));
    }

    #[tokio::test]
    async fn test_deny_flow() {
        let (manager, _temp) = make_manager();
        let (tx, mut rx) = mpsc::unbounded_channel();

        manager.submit_token_request(tx, "phone", "r1");
        assert!(manager.deny_token_request("r1"));

        let response = rx.recv().await.unwrap();
        assert!(!response.success);
        assert!(response.token.is_empty());
        assert_eq!(response.id, "r1");

        assert!(!manager.deny_token_request("r1"));
    }

    #[tokio::test]
    async fn test_expiry_notifies_exactly_once() {
        // Zero timeout: the deadline is already due at submission
        let (manager, _temp) = make_manager_with_timeout(0);
        let (tx, mut rx) = mpsc::unbounded_channel();

        manager.submit_token_request(tx, "tv", "r2");

        assert_eq!(manager.sweep_expired_requests(), 1);

        let response = rx.recv().await.unwrap();
        assert!(!response.success);
        assert!(response.token.is_empty());
        assert_eq!(response.id, "r2");

        // No second notification, no lingering entry
        assert!(rx.try_recv().is_err());
        assert_eq!(manager.sweep_expired_requests(), 0);
        assert!(!manager.accept_token_request("r2"));
    }

    #[tokio::test]
    async fn test_submit_announces_to_subscribers() {
        let (manager, _temp) = make_manager();
        let mut events = manager.subscribe();
        let (tx, _rx) = mpsc::unbounded_channel();

        manager.submit_token_request(tx, "phone", "r1");

        let event = events.recv().await.unwrap();
        assert_eq!(event.id, "r1");
        assert_eq!(event.comment, "phone");
    }

    #[test]
    fn test_create_token_skips_request_chain() {
        let (manager, _temp) = make_manager();

        let record = manager.create_token("ci-pipeline").unwrap();
        assert!(!record.token.is_empty());
        assert_eq!(record.comment, "ci-pipeline");
        assert_eq!(record.user, DEFAULT_ADMIN_USER);

        assert!(manager.get_pending_requests().is_empty());
        assert!(manager.is_token_authorized(&record.token));
    }

    #[test]
    fn test_get_user_token_is_idempotent() {
        let (manager, _temp) = make_manager();

        let first = manager.get_user_token(DEFAULT_ADMIN_USER).unwrap();
        let second = manager.get_user_token(DEFAULT_ADMIN_USER).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_default_password_transitions() {
        let (manager, _temp) = make_manager();

        assert!(manager.has_default_password());
        assert!(manager.is_user_authorized(DEFAULT_ADMIN_USER, DEFAULT_ADMIN_PASSWORD));

        assert!(manager.update_user_password(DEFAULT_ADMIN_USER, DEFAULT_ADMIN_PASSWORD, "new-pw"));
        assert!(!manager.has_default_password());
        assert!(!manager.is_user_authorized(DEFAULT_ADMIN_USER, DEFAULT_ADMIN_PASSWORD));
        assert!(manager.is_user_authorized(DEFAULT_ADMIN_USER, "new-pw"));
    }

    #[test]
    fn test_wrong_old_password_leaves_credentials_unchanged() {
        let (manager, _temp) = make_manager();

        assert!(!manager.update_user_password(DEFAULT_ADMIN_USER, "wrong-old", "new"));
        assert!(!manager.is_user_authorized(DEFAULT_ADMIN_USER, "new"));
        assert!(manager.has_default_password());
    }

    #[test]
    fn test_reset_admin_invalidates_token() {
        let (manager, _temp) = make_manager();

        let token = manager.get_user_token(DEFAULT_ADMIN_USER).unwrap();
        manager.update_user_password(DEFAULT_ADMIN_USER, DEFAULT_ADMIN_PASSWORD, "changed");

        assert!(manager.reset_admin_user());
        assert!(manager.has_default_password());
        assert!(!manager.is_token_authorized(&token));
    }

    #[test]
    fn test_delete_token_by_id() {
        let (manager, _temp) = make_manager();

        let record = manager.create_token("phone").unwrap();
        assert_eq!(manager.get_token_list().len(), 1);

        assert!(manager.delete_token(&record.id));
        assert!(manager.get_token_list().is_empty());
        assert!(!manager.is_token_authorized(&record.token));
        assert!(!manager.delete_token(&record.id));
    }

    #[test]
    fn test_last_use_refresh_on_verification() {
        let (manager, _temp) = make_manager();

        let record = manager.create_token("phone").unwrap();
        assert!(manager.is_token_authorized(&record.token));

        let listed = manager.get_token_list();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].last_use >= record.last_use);
    }

    #[test]
    fn test_installation_id_is_stable() {
        let (manager, _temp) = make_manager();
        let id = manager.installation_id().to_string();
        assert!(!id.is_empty());
        assert_eq!(manager.installation_id(), id);
    }

    #[test]
    fn test_default_flags() {
        let (manager, _temp) = make_manager();

        assert!(manager.is_auth_required());
        assert!(manager.is_local_admin_auth_required());
        assert!(!manager.is_local_auth_required());
    }
}
