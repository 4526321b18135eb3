mod admin;
mod auth;
mod requests;
mod tokens;

pub use admin::{get_auth_flags, health, reset_admin, update_settings};
pub use auth::{login, update_password, verify_token};
pub use requests::{
    accept_token_request, deny_token_request, list_token_requests, submit_token_request,
};
pub use tokens::{create_token, delete_token, get_user_token, list_tokens};
