use std::sync::Arc;

use accounts::contract::{AccountsApi, AccountsError};
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::ports::UserDirectory;

/// `UserDirectory` backed by the accounts module's in-process client.
pub struct AccountsUserDirectory {
    accounts: Arc<dyn AccountsApi>,
}

impl AccountsUserDirectory {
    pub fn new(accounts: Arc<dyn AccountsApi>) -> Self {
        Self { accounts }
    }
}

#[async_trait]
impl UserDirectory for AccountsUserDirectory {
    async fn user_exists(&self, user_id: Uuid) -> anyhow::Result<bool> {
        match self.accounts.get_user(user_id).await {
            Ok(_) => Ok(true),
            Err(AccountsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(anyhow::Error::new(e).context("accounts lookup failed")),
        }
    }
}
