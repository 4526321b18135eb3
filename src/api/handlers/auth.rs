use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub password: String,
    pub user: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// True while the account still holds the well-known default password;
    /// clients should force a password change
    pub default_password: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyTokenRequest {
    pub token: String,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub new_password: String,
    pub password: String,
    pub user: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn login(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<JSend<LoginResponse>>, ApiError> {
    if req.user.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("user and password are required"));
    }

    if !state.auth.is_user_authorized(&req.user, &req.password) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    Ok(JSend::success(LoginResponse {
        default_password: state.auth.has_default_password(),
    }))
}

pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<VerifyTokenRequest>,
) -> Result<Json<JSend<()>>, ApiError> {
    if req.token.trim().is_empty() {
        return Err(ApiError::bad_request("token is required"));
    }

    let authorized = match req.user.as_deref() {
        Some(user) => state.auth.is_user_token_authorized(user, &req.token),
        None => state.auth.is_token_authorized(&req.token),
    };

    if !authorized {
        return Err(ApiError::unauthorized("Invalid token"));
    }

    Ok(JSend::success(()))
}

pub async fn update_password(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<UpdatePasswordRequest>,
) -> Result<Json<JSend<()>>, ApiError> {
    if req.user.trim().is_empty() || req.new_password.is_empty() {
        return Err(ApiError::bad_request("user and new_password are required"));
    }

    if !state
        .auth
        .update_user_password(&req.user, &req.password, &req.new_password)
    {
        return Err(ApiError::forbidden("Password update rejected"));
    }

    Ok(JSend::success(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USER};
    use crate::testutil::test_state;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_login_with_default_credentials() {
        let (state, _temp) = test_state();

        let response = login(
            State(state),
            AppJson(LoginRequest {
                password: DEFAULT_ADMIN_PASSWORD.to_string(),
                user: DEFAULT_ADMIN_USER.to_string(),
            }),
        )
        .await
        .unwrap();

        // Fresh installation must prompt a password change
        assert!(response.0.data.default_password);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let (state, _temp) = test_state();

        let result = login(
            State(state),
            AppJson(LoginRequest {
                password: "wrong".to_string(),
                user: DEFAULT_ADMIN_USER.to_string(),
            }),
        )
        .await;

        match result {
            Err(ApiError::Fail(code, _)) => assert_eq!(code, StatusCode::UNAUTHORIZED),
            other => panic!("expected unauthorized, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_token_roundtrip() {
        let (state, _temp) = test_state();
        let record = state.auth.create_token("phone").unwrap();

        let verified = verify_token(
            State(Arc::clone(&state)),
            AppJson(VerifyTokenRequest {
                token: record.token.clone(),
                user: None,
            }),
        )
        .await;
        assert!(verified.is_ok());

        let verified = verify_token(
            State(state),
            AppJson(VerifyTokenRequest {
                token: "bogus".to_string(),
                user: None,
            }),
        )
        .await;
        assert!(verified.is_err());
    }
}
