//! Applies configuration-change payloads to the auth facade.

use std::sync::Arc;

use serde_json::Value;

use crate::manager::AuthManager;

/// Watches for configuration updates and pushes the recognized
/// authorization fields into [`AuthManager`].
///
/// Unrecognized fields are ignored; missing fields retain their prior
/// value. Malformed payloads carry no recognized fields and apply as a
/// no-op. This operation never fails.
pub struct SettingsObserver {
    auth: Arc<AuthManager>,
}

impl SettingsObserver {
    pub fn new(auth: Arc<AuthManager>) -> Self {
        Self { auth }
    }

    /// Overlay the recognized boolean fields onto the current flags and
    /// replace them wholesale.
    pub fn apply(&self, payload: &Value) {
        let mut flags = self.auth.auth_flags();

        if let Some(value) = payload.get("authRequired").and_then(Value::as_bool) {
            flags.auth_required = value;
        }
        if let Some(value) = payload.get("localAuthRequired").and_then(Value::as_bool) {
            flags.local_auth_required = value;
        }
        if let Some(value) = payload
            .get("localAdminAuthRequired")
            .and_then(Value::as_bool)
        {
            flags.local_admin_auth_required = value;
        }

        self.auth.replace_flags(flags);
    }
}
