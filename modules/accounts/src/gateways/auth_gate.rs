use std::sync::Arc;

use async_trait::async_trait;
use modkit::{AuthError, AuthGate, Caller};

use crate::domain::error::DomainError;
use crate::domain::service::Service;

/// Resolves bearer tokens against the identity store.
pub struct AccountsAuthGate {
    service: Arc<Service>,
}

impl AccountsAuthGate {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl AuthGate for AccountsAuthGate {
    async fn resolve(&self, bearer_token: &str) -> Result<Caller, AuthError> {
        self.service
            .resolve_caller(bearer_token)
            .await
            .map_err(|e| match e {
                DomainError::InvalidToken { message } => AuthError::InvalidToken(message),
                other => AuthError::Unavailable(anyhow::Error::new(other)),
            })
    }
}
