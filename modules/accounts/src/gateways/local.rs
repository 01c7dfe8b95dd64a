use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    client::AccountsApi,
    error::AccountsError,
    model::{AccessToken, NewUser, User},
};
use crate::domain::service::Service;

/// Local implementation of the AccountsApi trait that delegates to the domain service.
pub struct AccountsLocalClient {
    service: Arc<Service>,
}

impl AccountsLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl AccountsApi for AccountsLocalClient {
    async fn get_user(&self, id: Uuid) -> Result<User, AccountsError> {
        self.service.get_user(id).await.map_err(Into::into)
    }

    async fn find_by_username(&self, username: &str) -> Result<User, AccountsError> {
        self.service
            .find_by_username(username)
            .await
            .map_err(Into::into)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, AccountsError> {
        self.service.find_by_email(email).await.map_err(Into::into)
    }

    async fn list_users(&self) -> Result<Vec<User>, AccountsError> {
        self.service.list_users().await.map_err(Into::into)
    }

    async fn register(&self, new_user: NewUser) -> Result<User, AccountsError> {
        self.service.register(new_user).await.map_err(Into::into)
    }

    async fn login(&self, email: &str, password: &str) -> Result<AccessToken, AccountsError> {
        self.service.login(email, password).await.map_err(Into::into)
    }
}
