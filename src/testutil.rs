//! Shared test helpers — available to all `#[cfg(test)]` modules in the crate.

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use crate::config::{AuthConfig, Config, NodeConfig};
use crate::credentials::CredentialStore;
use crate::manager::AuthManager;
use crate::settings::SettingsObserver;
use crate::storage::models::TokenRecord;
use crate::storage::Database;
use crate::tokens::DefaultPasswordHasher;
use crate::AppState;

/// Open a fresh database in a temporary directory.
///
/// Returns both the `Database` and the `TempDir` guard — the caller must
/// keep the `TempDir` alive for the duration of the test.
pub fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::open(temp_dir.path()).unwrap();
    (db, temp_dir)
}

/// A minimal `Config` suitable for unit tests.
pub fn test_config() -> Config {
    Config {
        auth: AuthConfig::default(),
        node: NodeConfig {
            bind_address: "127.0.0.1:8090".to_string(),
            data_dir: "/tmp/test".to_string(),
        },
    }
}

/// Build a `CredentialStore` with the default user bootstrapped.
pub fn make_credentials() -> (CredentialStore, TempDir) {
    let (db, temp_dir) = setup_db();
    let store = CredentialStore::new(db, Arc::new(DefaultPasswordHasher));
    store.ensure_default_user().unwrap();
    (store, temp_dir)
}

/// Build an `AuthManager` with the default request timeout.
pub fn make_manager() -> (AuthManager, TempDir) {
    make_manager_with_timeout(AuthConfig::default().request_timeout_seconds)
}

/// Build an `AuthManager` whose pending requests time out after the given
/// number of seconds. Zero makes every request due on the next sweep.
pub fn make_manager_with_timeout(request_timeout_seconds: u64) -> (AuthManager, TempDir) {
    let (db, temp_dir) = setup_db();
    let config = AuthConfig {
        request_timeout_seconds,
        ..AuthConfig::default()
    };
    let manager = AuthManager::new(db, Arc::new(DefaultPasswordHasher), &config).unwrap();
    (manager, temp_dir)
}

/// Build a full `Arc<AppState>` around a fresh database.
pub fn test_state() -> (Arc<AppState>, TempDir) {
    let (db, temp_dir) = setup_db();
    let config = test_config();
    let auth = Arc::new(
        AuthManager::new(db, Arc::new(DefaultPasswordHasher), &config.auth).unwrap(),
    );
    let state = Arc::new(AppState {
        auth: Arc::clone(&auth),
        config,
        settings: SettingsObserver::new(auth),
    });
    (state, temp_dir)
}

/// Create a `TokenRecord` with the given id and owner.
pub fn make_token(id: &str, user: &str) -> TokenRecord {
    let now = Utc::now();
    TokenRecord {
        comment: format!("comment-{id}"),
        created_at: now,
        id: id.to_string(),
        last_use: now,
        token: format!("tok_{id}"),
        user: user.to_string(),
    }
}
