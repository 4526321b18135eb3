use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/auth/password", put(handlers::update_password))
        .route("/auth/verify", post(handlers::verify_token))
        .route(
            "/settings/auth",
            get(handlers::get_auth_flags).put(handlers::update_settings),
        )
        .route(
            "/tokens",
            post(handlers::create_token).get(handlers::list_tokens),
        )
        .route("/tokens/:id", delete(handlers::delete_token))
        .route(
            "/token-requests",
            post(handlers::submit_token_request).get(handlers::list_token_requests),
        )
        .route(
            "/token-requests/:id/accept",
            post(handlers::accept_token_request),
        )
        .route(
            "/token-requests/:id/deny",
            post(handlers::deny_token_request),
        )
        .route("/users/:user/token", get(handlers::get_user_token))
        .route("/users/admin/reset", post(handlers::reset_admin))
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
