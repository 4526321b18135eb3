//! Credential store: user accounts and issued tokens.
//!
//! Wraps the persistent [`Database`] and the pluggable password hasher
//! behind the operation set the auth facade consumes. All operations are
//! synchronous and side-effecting only on success.

use std::sync::Arc;

use chrono::Utc;

use crate::storage::models::{TokenRecord, UserRecord};
use crate::storage::{Database, DatabaseError};
use crate::tokens::{generate_token, PasswordHasher};

/// The fixed administrative account
pub const DEFAULT_ADMIN_USER: &str = "Hyperion";

/// Well-known initial password for the administrative account
pub const DEFAULT_ADMIN_PASSWORD: &str = "hyperion";

#[derive(Clone)]
pub struct CredentialStore {
    db: Database,
    hasher: Arc<dyn PasswordHasher>,
}

impl CredentialStore {
    pub fn new(db: Database, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { db, hasher }
    }

    /// Create the administrative account with default credentials if absent.
    ///
    /// Called once at startup before any authorization check runs.
    pub fn ensure_default_user(&self) -> Result<(), DatabaseError> {
        if self.db.get_user(DEFAULT_ADMIN_USER)?.is_none() {
            self.db.put_user(&UserRecord {
                created_at: Utc::now(),
                password_hash: self.hasher.hash(DEFAULT_ADMIN_PASSWORD),
                user: DEFAULT_ADMIN_USER.to_string(),
            })?;
            tracing::info!(user = DEFAULT_ADMIN_USER, "Created default user");
        }
        Ok(())
    }

    /// Check a password against the stored credential material.
    ///
    /// Unknown user and wrong password are indistinguishable to the caller.
    pub fn verify_password(&self, user: &str, password: &str) -> Result<bool, DatabaseError> {
        match self.db.get_user(user)? {
            Some(record) => Ok(self.hasher.verify(password, &record.password_hash)),
            None => Ok(false),
        }
    }

    /// Rotate a user's password. Fails when the old password does not verify.
    ///
    /// Existing tokens stay valid across a rotation.
    pub fn update_password(
        &self,
        user: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<bool, DatabaseError> {
        let record = match self.db.get_user(user)? {
            Some(record) => record,
            None => return Ok(false),
        };

        if !self.hasher.verify(old_password, &record.password_hash) {
            return Ok(false);
        }

        self.db.put_user(&UserRecord {
            password_hash: self.hasher.hash(new_password),
            ..record
        })?;
        tracing::debug!(user = %user, "Updated user password");
        Ok(true)
    }

    /// Issue a new token for a user.
    pub fn set_token(&self, user: &str, comment: &str) -> Result<TokenRecord, DatabaseError> {
        let now = Utc::now();
        let record = TokenRecord {
            comment: comment.to_string(),
            created_at: now,
            id: uuid::Uuid::new_v4().to_string(),
            last_use: now,
            token: generate_token(),
            user: user.to_string(),
        };

        self.db.put_token(&record)?;
        tracing::debug!(id = %record.id, user = %user, "Issued token");

        Ok(record)
    }

    /// Get the current token record for a user, if one exists.
    pub fn get_token_for_user(&self, user: &str) -> Result<Option<TokenRecord>, DatabaseError> {
        Ok(self.db.get_tokens_by_user(user)?.into_iter().next())
    }

    /// Look up a token record by its secret value, refreshing last_use on hit.
    pub fn find_by_token(&self, token: &str) -> Result<Option<TokenRecord>, DatabaseError> {
        match self.db.get_token_by_secret(token)? {
            Some(record) => {
                // last_use refresh is best-effort; a failed write does not
                // fail the verification itself
                if let Err(e) = self.db.touch_token(&record.id, Utc::now()) {
                    tracing::warn!(error = %e, id = %record.id, "Failed to update token last_use");
                }
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Like [`find_by_token`](Self::find_by_token), additionally requiring
    /// the record to belong to the given user.
    pub fn find_by_user_and_token(
        &self,
        user: &str,
        token: &str,
    ) -> Result<Option<TokenRecord>, DatabaseError> {
        match self.db.get_token_by_secret(token)? {
            Some(record) if record.user == user => {
                if let Err(e) = self.db.touch_token(&record.id, Utc::now()) {
                    tracing::warn!(error = %e, id = %record.id, "Failed to update token last_use");
                }
                Ok(Some(record))
            }
            _ => Ok(None),
        }
    }

    /// Delete a token by its non-secret id.
    pub fn delete_by_id(&self, id: &str) -> Result<bool, DatabaseError> {
        let deleted = self.db.delete_token(id)?;
        if deleted {
            tracing::debug!(id = %id, "Deleted token");
        }
        Ok(deleted)
    }

    /// List every issued token.
    pub fn list_all(&self) -> Result<Vec<TokenRecord>, DatabaseError> {
        self.db.get_all_tokens()
    }

    /// Restore a user to default credential state and revoke their tokens.
    pub fn reset_user(&self, user: &str) -> Result<bool, DatabaseError> {
        let record = match self.db.get_user(user)? {
            Some(record) => record,
            None => return Ok(false),
        };

        self.db.put_user(&UserRecord {
            password_hash: self.hasher.hash(DEFAULT_ADMIN_PASSWORD),
            ..record
        })?;

        for token in self.db.get_tokens_by_user(user)? {
            self.db.delete_token(&token.id)?;
        }

        tracing::info!(user = %user, "Reset user to default credentials");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_credentials;

    #[test]
    fn test_default_user_bootstrap() {
        let (store, _temp) = make_credentials();

        assert!(store
            .verify_password(DEFAULT_ADMIN_USER, DEFAULT_ADMIN_PASSWORD)
            .unwrap());
        assert!(!store.verify_password(DEFAULT_ADMIN_USER, "wrong").unwrap());
        assert!(!store.verify_password("nobody", "hyperion").unwrap());
    }

    #[test]
    fn test_update_password() {
        let (store, _temp) = make_credentials();

        assert!(store
            .update_password(DEFAULT_ADMIN_USER, DEFAULT_ADMIN_PASSWORD, "s3cret")
            .unwrap());
        assert!(store.verify_password(DEFAULT_ADMIN_USER, "s3cret").unwrap());
        assert!(!store
            .verify_password(DEFAULT_ADMIN_USER, DEFAULT_ADMIN_PASSWORD)
            .unwrap());
    }

    #[test]
    fn test_update_password_wrong_old_is_noop() {
        let (store, _temp) = make_credentials();

        assert!(!store
            .update_password(DEFAULT_ADMIN_USER, "wrong-old", "new")
            .unwrap());
        assert!(!store.verify_password(DEFAULT_ADMIN_USER, "new").unwrap());
        assert!(store
            .verify_password(DEFAULT_ADMIN_USER, DEFAULT_ADMIN_PASSWORD)
            .unwrap());
    }

    #[test]
    fn test_token_issue_and_find() {
        let (store, _temp) = make_credentials();

        let record = store.set_token(DEFAULT_ADMIN_USER, "ci-pipeline").unwrap();
        assert!(!record.token.is_empty());

        let found = store.find_by_token(&record.token).unwrap();
        assert_eq!(found.unwrap().id, record.id);

        let found = store
            .find_by_user_and_token(DEFAULT_ADMIN_USER, &record.token)
            .unwrap();
        assert!(found.is_some());

        // Same secret, wrong owner
        let found = store.find_by_user_and_token("kiosk", &record.token).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_reset_user_revokes_tokens() {
        let (store, _temp) = make_credentials();

        store
            .update_password(DEFAULT_ADMIN_USER, DEFAULT_ADMIN_PASSWORD, "changed")
            .unwrap();
        let record = store.set_token(DEFAULT_ADMIN_USER, "phone").unwrap();

        assert!(store.reset_user(DEFAULT_ADMIN_USER).unwrap());
        assert!(store
            .verify_password(DEFAULT_ADMIN_USER, DEFAULT_ADMIN_PASSWORD)
            .unwrap());
        assert!(store.find_by_token(&record.token).unwrap().is_none());

        assert!(!store.reset_user("nobody").unwrap());
    }
}
