use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::User;

/// Whether soft-deleted rows are visible to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    ActiveOnly,
    IncludeDeleted,
}

/// A stored user together with its credential.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub roles: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

/// Column-level update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserFields {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub roles: Option<BTreeSet<String>>,
    pub deleted_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Inserted(User),
    UsernameTaken,
    EmailTaken,
}

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Updated(User),
    NotFound,
    UsernameTaken,
    EmailTaken,
}

/// Identity store port. Uniqueness of username and email among active users
/// is enforced by the store and reported through the outcome enums.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid, visibility: Visibility)
        -> anyhow::Result<Option<UserRecord>>;

    /// Active users only; `exclude` skips one id (used for "taken by someone else").
    async fn find_by_username(
        &self,
        username: &str,
        exclude: Option<Uuid>,
    ) -> anyhow::Result<Option<UserRecord>>;

    async fn find_by_email(
        &self,
        email: &str,
        exclude: Option<Uuid>,
    ) -> anyhow::Result<Option<UserRecord>>;

    /// Active users ordered by username.
    async fn list_active(&self) -> anyhow::Result<Vec<User>>;

    async fn insert(&self, record: NewUserRecord) -> anyhow::Result<InsertOutcome>;

    async fn update_fields(&self, id: Uuid, fields: UserFields) -> anyhow::Result<UpdateOutcome>;
}
