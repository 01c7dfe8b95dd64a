//! Caller identity for REST handlers.
//!
//! A module that can verify bearer tokens publishes an [`AuthGate`]; routers
//! carry it as `Extension<Arc<dyn AuthGate>>` and handlers ask for
//! [`Authenticated`] or [`AdminOnly`] in their signature.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::api::problem::{
    forbidden, internal_error, service_unavailable, unauthorized, ProblemResponse,
};

pub const ADMIN_ROLE: &str = "admin";

/// The identity behind a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub roles: BTreeSet<String>,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(ADMIN_ROLE)
    }

    /// Admins may act on anyone; everyone else only on themselves.
    pub fn may_act_for(&self, user_id: Uuid) -> bool {
        self.is_admin() || self.user_id == user_id
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingCredentials,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("identity store unavailable")]
    Unavailable(#[source] anyhow::Error),
}

#[async_trait]
pub trait AuthGate: Send + Sync {
    /// Verify a bearer token and resolve who is calling.
    async fn resolve(&self, bearer_token: &str) -> Result<Caller, AuthError>;
}

impl From<AuthError> for ProblemResponse {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingCredentials | AuthError::InvalidToken(_) => unauthorized(e.to_string()),
            AuthError::Unavailable(source) => {
                tracing::error!(error = %source, "auth gate failed");
                service_unavailable("identity store unavailable")
            }
        }
    }
}

fn bearer(parts: &Parts) -> Result<&str, AuthError> {
    let raw = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("malformed authorization header".into()))?;
    // Auth scheme names are case-insensitive (RFC 9110 §11.1).
    let (scheme, token) = raw.trim().split_once(' ').ok_or(AuthError::MissingCredentials)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MissingCredentials);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(token)
}

async fn resolve_caller(parts: &Parts) -> Result<Caller, ProblemResponse> {
    let gate = parts
        .extensions
        .get::<Arc<dyn AuthGate>>()
        .cloned()
        .ok_or_else(|| {
            tracing::error!("route requires authentication but no AuthGate is installed");
            internal_error("authentication is not configured")
        })?;
    let token = bearer(parts)?;
    Ok(gate.resolve(token).await?)
}

/// Any caller holding a valid token; 401 otherwise.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Caller);

impl<S> FromRequestParts<S> for Authenticated
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolve_caller(parts).await.map(Authenticated)
    }
}

/// A caller with the admin role; 401 without a valid token, 403 without the role.
#[derive(Debug, Clone)]
pub struct AdminOnly(pub Caller);

impl<S> FromRequestParts<S> for AdminOnly
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = resolve_caller(parts).await?;
        if !caller.is_admin() {
            return Err(forbidden("admin role required"));
        }
        Ok(AdminOnly(caller))
    }
}
