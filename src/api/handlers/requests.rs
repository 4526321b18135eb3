use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::requests::PendingRequest;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct SubmitTokenRequest {
    pub comment: String,
    /// Caller-chosen identifier, echoed back in the resolution
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenGrantResponse {
    pub comment: String,
    pub id: String,
    pub token: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a token request and wait for its resolution.
///
/// The connection stays open until an administrator accepts or denies the
/// request, or the sweeper expires it. A grant answers with the token; a
/// denial or expiry answers 403.
pub async fn submit_token_request(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SubmitTokenRequest>,
) -> Result<Json<JSend<TokenGrantResponse>>, ApiError> {
    if req.id.trim().is_empty() || req.comment.trim().is_empty() {
        return Err(ApiError::bad_request("id and comment are required"));
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.auth.submit_token_request(tx, &req.comment, &req.id);

    match rx.recv().await {
        Some(response) if response.success => Ok(JSend::success(TokenGrantResponse {
            comment: response.comment,
            id: response.id,
            token: response.token,
        })),
        Some(_) => Err(ApiError::forbidden("Token request denied")),
        // Channel closed without a resolution: a later submission reused
        // this id and displaced the entry
        None => Err(ApiError::conflict("Token request superseded")),
    }
}

pub async fn list_token_requests(
    State(state): State<Arc<AppState>>,
) -> Json<JSend<HashMap<String, PendingRequest>>> {
    JSend::success(state.auth.get_pending_requests())
}

pub async fn accept_token_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    if !state.auth.accept_token_request(&id) {
        return Err(ApiError::not_found("Request not found"));
    }

    tracing::debug!(id = %id, "Accepted token request");
    Ok(JSend::success(()))
}

pub async fn deny_token_request(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    if !state.auth.deny_token_request(&id) {
        return Err(ApiError::not_found("Request not found"));
    }

    tracing::debug!(id = %id, "Denied token request");
    Ok(JSend::success(()))
}
