//! SeaORM-backed identity store.
//!
//! Generic over `C: ConnectionTrait`, so it can run on a `DatabaseConnection`
//! or inside a transaction.

use anyhow::Context;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Select, Set,
};
use uuid::Uuid;

use crate::contract::User;
use crate::domain::repo::{
    InsertOutcome, NewUserRecord, UpdateOutcome, UserFields, UserRecord, UsersRepository,
    Visibility,
};
use crate::infra::storage::entity::{ActiveModel as UserAM, Column, Entity as UserEntity};
use crate::infra::storage::mapper::join_roles;

pub struct SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    /// The one place the soft-delete predicate is applied.
    fn scoped(visibility: Visibility) -> Select<UserEntity> {
        match visibility {
            Visibility::ActiveOnly => UserEntity::find().filter(Column::DeletedAt.is_null()),
            Visibility::IncludeDeleted => UserEntity::find(),
        }
    }

    fn excluding(query: Select<UserEntity>, exclude: Option<Uuid>) -> Select<UserEntity> {
        match exclude {
            Some(id) => query.filter(Column::Id.ne(id)),
            None => query,
        }
    }

    /// After a unique violation, tell which key collided.
    async fn username_collides(&self, username: &str, own_id: Uuid) -> anyhow::Result<bool> {
        let hit = Self::excluding(Self::scoped(Visibility::ActiveOnly), Some(own_id))
            .filter(Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("username collision lookup failed")?;
        Ok(hit.is_some())
    }
}

#[async_trait::async_trait]
impl<C> UsersRepository for SeaOrmUsersRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_id(
        &self,
        id: Uuid,
        visibility: Visibility,
    ) -> anyhow::Result<Option<UserRecord>> {
        let found = Self::scoped(visibility)
            .filter(Column::Id.eq(id))
            .one(&self.conn)
            .await
            .context("find_by_id failed")?;
        Ok(found.map(Into::into))
    }

    async fn find_by_username(
        &self,
        username: &str,
        exclude: Option<Uuid>,
    ) -> anyhow::Result<Option<UserRecord>> {
        let found = Self::excluding(Self::scoped(Visibility::ActiveOnly), exclude)
            .filter(Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("find_by_username failed")?;
        Ok(found.map(Into::into))
    }

    async fn find_by_email(
        &self,
        email: &str,
        exclude: Option<Uuid>,
    ) -> anyhow::Result<Option<UserRecord>> {
        let found = Self::excluding(Self::scoped(Visibility::ActiveOnly), exclude)
            .filter(Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("find_by_email failed")?;
        Ok(found.map(Into::into))
    }

    async fn list_active(&self) -> anyhow::Result<Vec<User>> {
        let rows = Self::scoped(Visibility::ActiveOnly)
            .order_by_asc(Column::Username)
            .all(&self.conn)
            .await
            .context("list_active failed")?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert(&self, record: NewUserRecord) -> anyhow::Result<InsertOutcome> {
        let id = record.id;
        let username = record.username.clone();
        let m = UserAM {
            id: Set(record.id),
            username: Set(record.username),
            email: Set(record.email),
            password_hash: Set(record.password_hash),
            roles: Set(join_roles(&record.roles)),
            created_at: Set(record.created_at),
            updated_at: Set(record.created_at),
            deleted_at: Set(None),
        };
        match m.insert(&self.conn).await {
            Ok(model) => Ok(InsertOutcome::Inserted(model.into())),
            Err(e) if modkit_db::is_unique_violation(&e) => {
                if self.username_collides(&username, id).await? {
                    Ok(InsertOutcome::UsernameTaken)
                } else {
                    Ok(InsertOutcome::EmailTaken)
                }
            }
            Err(e) => Err(e).context("insert failed"),
        }
    }

    async fn update_fields(&self, id: Uuid, fields: UserFields) -> anyhow::Result<UpdateOutcome> {
        let Some(current) = UserEntity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("update_fields lookup failed")?
        else {
            return Ok(UpdateOutcome::NotFound);
        };

        let username = fields
            .username
            .clone()
            .unwrap_or_else(|| current.username.clone());
        let mut m: UserAM = current.into();
        if let Some(v) = fields.username {
            m.username = Set(v);
        }
        if let Some(v) = fields.email {
            m.email = Set(v);
        }
        if let Some(v) = fields.password_hash {
            m.password_hash = Set(v);
        }
        if let Some(v) = fields.roles {
            m.roles = Set(join_roles(&v));
        }
        if let Some(v) = fields.deleted_at {
            m.deleted_at = Set(v);
        }
        if let Some(v) = fields.updated_at {
            m.updated_at = Set(v);
        }

        match m.update(&self.conn).await {
            Ok(model) => Ok(UpdateOutcome::Updated(model.into())),
            Err(DbErr::RecordNotUpdated) => Ok(UpdateOutcome::NotFound),
            Err(e) if modkit_db::is_unique_violation(&e) => {
                if self.username_collides(&username, id).await? {
                    Ok(UpdateOutcome::UsernameTaken)
                } else {
                    Ok(UpdateOutcome::EmailTaken)
                }
            }
            Err(e) => Err(e).context("update failed"),
        }
    }
}
