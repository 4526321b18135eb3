//! Password hashing seam.
//!
//! The daemon treats the hash algorithm as a pluggable capability: the
//! facade only ever talks to the [`PasswordHasher`] trait, so deployments
//! can swap in a hardened implementation without touching the auth flow.

use std::fmt::Debug;

/// Hash and verify user passwords.
pub trait PasswordHasher: Debug + Send + Sync {
    /// Hash a plaintext password into storable verification material.
    fn hash(&self, password: &str) -> String;

    /// Check a plaintext password against stored verification material.
    fn verify(&self, password: &str, hash: &str) -> bool {
        self.hash(password) == hash
    }
}

/// Default hasher backed by the std `DefaultHasher`.
///
/// Simple hash for now - in production, use a proper cryptographic hash
/// behind the same trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPasswordHasher;

impl PasswordHasher for DefaultPasswordHasher {
    fn hash(&self, password: &str) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        password.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }
}
