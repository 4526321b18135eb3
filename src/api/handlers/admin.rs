use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub installation_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct AuthFlagsResponse {
    pub auth_required: bool,
    pub local_admin_auth_required: bool,
    pub local_auth_required: bool,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health(State(state): State<Arc<AppState>>) -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        installation_id: state.auth.installation_id().to_string(),
        status: "healthy".to_string(),
    })
}

pub async fn get_auth_flags(State(state): State<Arc<AppState>>) -> Json<JSend<AuthFlagsResponse>> {
    let flags = state.auth.auth_flags();

    JSend::success(AuthFlagsResponse {
        auth_required: flags.auth_required,
        local_admin_auth_required: flags.local_admin_auth_required,
        local_auth_required: flags.local_auth_required,
    })
}

pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    AppJson(payload): AppJson<serde_json::Value>,
) -> Json<JSend<()>> {
    state.settings.apply(&payload);
    JSend::success(())
}

pub async fn reset_admin(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<()>>, ApiError> {
    if !state.auth.reset_admin_user() {
        return Err(ApiError::internal("User reset failed"));
    }

    tracing::warn!("Administrative account reset to default credentials");
    Ok(JSend::success(()))
}
