//! SeaORM-backed meeting store.
//!
//! Conditional operations lean on the partial unique indexes created by the
//! migration: a violated index is reported as a conflict outcome, so two
//! racing writers can never both succeed.

use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr,
    EntityTrait, QueryFilter, QueryOrder, Select, Set,
};
use tracing::debug;
use uuid::Uuid;

use crate::contract::model::{AttendanceInterval, Meeting};
use crate::domain::repo::{
    AppendOutcome, CloseOutcome, InsertOutcome, MeetingFields, MeetingsRepository, NewMeeting,
    UpdateOutcome, Visibility,
};
use crate::infra::storage::entity::{attendance, meeting};
use crate::infra::storage::mapper::to_meeting;

pub struct SeaOrmMeetingsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmMeetingsRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    /// The one place the soft-delete predicate is applied.
    fn scoped(visibility: Visibility) -> Select<meeting::Entity> {
        match visibility {
            Visibility::ActiveOnly => {
                meeting::Entity::find().filter(meeting::Column::DeletedAt.is_null())
            }
            Visibility::IncludeDeleted => meeting::Entity::find(),
        }
    }

    async fn with_attendance(&self, row: meeting::Model) -> anyhow::Result<Meeting> {
        let intervals = attendance::Entity::find()
            .filter(attendance::Column::MeetingId.eq(row.id))
            .order_by_asc(attendance::Column::Id)
            .all(&self.conn)
            .await
            .context("attendance lookup failed")?;
        Ok(to_meeting(row, intervals))
    }

    async fn one(&self, query: Select<meeting::Entity>) -> anyhow::Result<Option<Meeting>> {
        match query.one(&self.conn).await.context("meeting lookup failed")? {
            Some(row) => Ok(Some(self.with_attendance(row).await?)),
            None => Ok(None),
        }
    }

    /// After a unique violation on `meetings`, tell which key collided.
    async fn date_collides(&self, date: DateTime<Utc>, own_id: Uuid) -> anyhow::Result<bool> {
        let hit = Self::scoped(Visibility::ActiveOnly)
            .filter(meeting::Column::Date.eq(date))
            .filter(meeting::Column::Id.ne(own_id))
            .one(&self.conn)
            .await
            .context("date collision lookup failed")?;
        Ok(hit.is_some())
    }
}

#[async_trait::async_trait]
impl<C> MeetingsRepository for SeaOrmMeetingsRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    async fn find_by_date(
        &self,
        date: DateTime<Utc>,
        visibility: Visibility,
    ) -> anyhow::Result<Option<Meeting>> {
        self.one(
            Self::scoped(visibility)
                .filter(meeting::Column::Date.eq(date))
                .order_by_desc(meeting::Column::CreatedAt),
        )
        .await
    }

    async fn find_by_id(&self, id: Uuid, visibility: Visibility) -> anyhow::Result<Option<Meeting>> {
        self.one(Self::scoped(visibility).filter(meeting::Column::Id.eq(id)))
            .await
    }

    async fn find_by_code(
        &self,
        code: &str,
        exclude_id: Option<Uuid>,
    ) -> anyhow::Result<Option<Meeting>> {
        let mut query = Self::scoped(Visibility::ActiveOnly).filter(meeting::Column::Code.eq(code));
        if let Some(id) = exclude_id {
            query = query.filter(meeting::Column::Id.ne(id));
        }
        self.one(query).await
    }

    async fn list(&self, visibility: Visibility) -> anyhow::Result<Vec<Meeting>> {
        let rows = Self::scoped(visibility)
            .order_by_desc(meeting::Column::Date)
            .order_by_desc(meeting::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list meetings failed")?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut by_meeting: HashMap<Uuid, Vec<attendance::Model>> = HashMap::new();
        for a in attendance::Entity::find()
            .filter(attendance::Column::MeetingId.is_in(ids))
            .all(&self.conn)
            .await
            .context("list attendance failed")?
        {
            by_meeting.entry(a.meeting_id).or_default().push(a);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let intervals = by_meeting.remove(&row.id).unwrap_or_default();
                to_meeting(row, intervals)
            })
            .collect())
    }

    async fn insert(&self, new: NewMeeting) -> anyhow::Result<InsertOutcome> {
        let am = meeting::ActiveModel {
            id: Set(new.id),
            date: Set(new.date),
            code: Set(new.code),
            created_at: Set(new.created_at),
            updated_at: Set(new.created_at),
            deleted_at: Set(None),
        };
        match am.insert(&self.conn).await {
            Ok(row) => Ok(InsertOutcome::Inserted(to_meeting(row, Vec::new()))),
            Err(e) if modkit_db::is_unique_violation(&e) => {
                if self.date_collides(new.date, new.id).await? {
                    Ok(InsertOutcome::DateTaken)
                } else {
                    Ok(InsertOutcome::CodeTaken)
                }
            }
            Err(e) => Err(e).context("insert meeting failed"),
        }
    }

    async fn update_fields(&self, id: Uuid, fields: MeetingFields) -> anyhow::Result<UpdateOutcome> {
        let Some(current) = meeting::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("update_fields lookup failed")?
        else {
            return Ok(UpdateOutcome::NotFound);
        };

        let target_date = fields.date.unwrap_or(current.date);
        let mut am: meeting::ActiveModel = current.into();
        if let Some(v) = fields.date {
            am.date = Set(v);
        }
        if let Some(v) = fields.code {
            am.code = Set(v);
        }
        if let Some(v) = fields.deleted_at {
            am.deleted_at = Set(v);
        }
        if let Some(v) = fields.updated_at {
            am.updated_at = Set(v);
        }

        match am.update(&self.conn).await {
            Ok(row) => Ok(UpdateOutcome::Updated(self.with_attendance(row).await?)),
            Err(DbErr::RecordNotUpdated) => Ok(UpdateOutcome::NotFound),
            Err(e) if modkit_db::is_unique_violation(&e) => {
                if self.date_collides(target_date, id).await? {
                    Ok(UpdateOutcome::DateTaken)
                } else {
                    Ok(UpdateOutcome::CodeTaken)
                }
            }
            Err(e) => Err(e).context("update meeting failed"),
        }
    }

    async fn append_attendance(
        &self,
        meeting_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> anyhow::Result<AppendOutcome> {
        let live = Self::scoped(Visibility::ActiveOnly)
            .filter(meeting::Column::Id.eq(meeting_id))
            .one(&self.conn)
            .await
            .context("append_attendance lookup failed")?;
        if live.is_none() {
            return Ok(AppendOutcome::MeetingGone);
        }

        let am = attendance::ActiveModel {
            id: NotSet,
            meeting_id: Set(meeting_id),
            user_id: Set(user_id),
            start_time: Set(at),
            end_time: Set(None),
        };
        match am.insert(&self.conn).await {
            Ok(row) => Ok(AppendOutcome::Appended(row.into())),
            Err(e) if modkit_db::is_unique_violation(&e) => Ok(AppendOutcome::ActiveExists),
            Err(e) => Err(e).context("append_attendance failed"),
        }
    }

    async fn close_attendance(
        &self,
        meeting_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> anyhow::Result<CloseOutcome> {
        // Compare-and-set on `end_time IS NULL`; a lost race just picks the next open row.
        loop {
            let Some(open) = attendance::Entity::find()
                .filter(attendance::Column::MeetingId.eq(meeting_id))
                .filter(attendance::Column::UserId.eq(user_id))
                .filter(attendance::Column::EndTime.is_null())
                .order_by_asc(attendance::Column::Id)
                .one(&self.conn)
                .await
                .context("close_attendance lookup failed")?
            else {
                return Ok(CloseOutcome::NoneOpen);
            };

            let res = attendance::Entity::update_many()
                .col_expr(attendance::Column::EndTime, Expr::value(at))
                .filter(attendance::Column::Id.eq(open.id))
                .filter(attendance::Column::EndTime.is_null())
                .exec(&self.conn)
                .await
                .context("close_attendance failed")?;

            if res.rows_affected == 1 {
                let mut closed: AttendanceInterval = open.into();
                closed.end_time = Some(at);
                return Ok(CloseOutcome::Closed(closed));
            }
            debug!(interval_id = open.id, "Interval closed concurrently; retrying");
        }
    }
}
