use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    error::AccountsError,
    model::{AccessToken, NewUser, User},
};

/// In-process API of the accounts module, published to the `ClientHub`.
///
/// Lookups only return non-deleted users.
#[async_trait]
pub trait AccountsApi: Send + Sync {
    async fn get_user(&self, id: Uuid) -> Result<User, AccountsError>;

    async fn find_by_username(&self, username: &str) -> Result<User, AccountsError>;

    async fn find_by_email(&self, email: &str) -> Result<User, AccountsError>;

    async fn list_users(&self) -> Result<Vec<User>, AccountsError>;

    async fn register(&self, new_user: NewUser) -> Result<User, AccountsError>;

    async fn login(&self, email: &str, password: &str) -> Result<AccessToken, AccountsError>;
}
