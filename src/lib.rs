//! prismd-auth - Authorization and token management for the prismd
//! device-control daemon
//!
//! This crate provides user and API-token authorization with:
//! - Password verification behind a pluggable hashing seam
//! - Opaque token issuance, listing, and revocation
//! - An asynchronous pending-request workflow (submit, accept/deny,
//!   timeout expiry) with point-to-point resolution delivery
//! - Periodic expiry sweeping via a background task
//! - redb embedded database (ACID, MVCC, crash-safe)
//! - Administrative REST API

pub mod api;
pub mod config;
pub mod credentials;
pub mod expiration;
pub mod manager;
pub mod requests;
pub mod settings;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod tokens;

use std::sync::Arc;

use config::Config;
use manager::AuthManager;
use settings::SettingsObserver;

/// Shared application state
pub struct AppState {
    pub auth: Arc<AuthManager>,
    pub config: Config,
    pub settings: SettingsObserver,
}
