use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::storage::models::TokenRecord;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateTokenRequest {
    pub comment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTokenResponse {
    pub comment: String,
    pub created_at: String,
    pub id: String,
    /// The secret itself; shown once at issuance
    pub token: String,
}

/// Listing view of an issued token. The secret is not repeated here.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenInfoResponse {
    pub comment: String,
    pub created_at: String,
    pub id: String,
    pub last_use: String,
    pub user: String,
}

#[derive(Debug, Serialize)]
pub struct UserTokenResponse {
    pub token: String,
    pub user: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_token(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateTokenRequest>,
) -> Result<Json<JSend<CreateTokenResponse>>, ApiError> {
    if req.comment.trim().is_empty() {
        return Err(ApiError::bad_request("comment is required"));
    }

    let record = state
        .auth
        .create_token(&req.comment)
        .ok_or_else(|| ApiError::internal("Token issuance failed"))?;

    Ok(JSend::success(CreateTokenResponse {
        comment: record.comment,
        created_at: record.created_at.to_rfc3339(),
        id: record.id,
        token: record.token,
    }))
}

pub async fn list_tokens(
    State(state): State<Arc<AppState>>,
) -> Json<JSend<Vec<TokenInfoResponse>>> {
    let tokens = state
        .auth
        .get_token_list()
        .iter()
        .map(token_to_response)
        .collect();

    JSend::success(tokens)
}

pub async fn delete_token(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    if !state.auth.delete_token(&id) {
        return Err(ApiError::not_found("Token not found"));
    }

    Ok(JSend::success(()))
}

pub async fn get_user_token(
    State(state): State<Arc<AppState>>,
    Path(user): Path<String>,
) -> Result<Json<JSend<UserTokenResponse>>, ApiError> {
    let token = state
        .auth
        .get_user_token(&user)
        .ok_or_else(|| ApiError::internal("Token issuance failed"))?;

    Ok(JSend::success(UserTokenResponse { token, user }))
}

// ============================================================================
// Helpers
// ============================================================================

fn token_to_response(record: &TokenRecord) -> TokenInfoResponse {
    TokenInfoResponse {
        comment: record.comment.clone(),
        created_at: record.created_at.to_rfc3339(),
        id: record.id.clone(),
        last_use: record.last_use.to_rfc3339(),
        user: record.user.clone(),
    }
}
