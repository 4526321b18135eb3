use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user credential record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// When the account was created
    pub created_at: DateTime<Utc>,
    /// Password verification material (algorithm behind the hasher seam)
    pub password_hash: String,
    /// The username
    pub user: String,
}

/// An issued API token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Free-text purpose supplied at issuance
    pub comment: String,
    /// When the token was issued
    pub created_at: DateTime<Utc>,
    /// Non-secret UUID identifier (used for listing, revoking)
    pub id: String,
    /// Last successful verification against this token
    pub last_use: DateTime<Utc>,
    /// Opaque secret (32-byte hex, used for verification)
    pub token: String,
    /// Owning user
    pub user: String,
}
