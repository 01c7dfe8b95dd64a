use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::contract::User;

/// One-way password hashing. Implementations are CPU-bound; the service calls
/// them on the blocking pool.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> anyhow::Result<String>;

    /// `Ok(false)` for a wrong password; `Err` only for a corrupt hash.
    fn verify(&self, password: &str, hash: &str) -> anyhow::Result<bool>;
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("{0}")]
    Invalid(String),
}

/// Opaque bearer tokens bound to a user id.
pub trait TokenIssuer: Send + Sync {
    fn issue(&self, user: &User, issued_at: DateTime<Utc>, ttl: Duration)
        -> anyhow::Result<String>;

    fn verify(&self, token: &str) -> Result<Uuid, TokenError>;
}
