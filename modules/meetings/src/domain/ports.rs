use async_trait::async_trait;
use uuid::Uuid;

/// Identity store as seen by the meetings module.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `Ok(false)` when the user is unknown or deleted.
    async fn user_exists(&self, user_id: Uuid) -> anyhow::Result<bool>;
}
