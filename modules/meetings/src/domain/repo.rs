use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{AttendanceInterval, Meeting};

/// Whether soft-deleted meetings are visible to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    ActiveOnly,
    IncludeDeleted,
}

#[derive(Debug, Clone)]
pub struct NewMeeting {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

/// Column-level update; `None` leaves a column untouched.
#[derive(Debug, Clone, Default)]
pub struct MeetingFields {
    pub date: Option<DateTime<Utc>>,
    pub code: Option<String>,
    pub deleted_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub enum InsertOutcome {
    Inserted(Meeting),
    DateTaken,
    CodeTaken,
}

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Updated(Meeting),
    NotFound,
    DateTaken,
    CodeTaken,
}

#[derive(Debug, Clone)]
pub enum AppendOutcome {
    Appended(AttendanceInterval),
    /// The user already has an open interval in this meeting.
    ActiveExists,
    /// The meeting was deleted or never existed.
    MeetingGone,
}

#[derive(Debug, Clone)]
pub enum CloseOutcome {
    Closed(AttendanceInterval),
    NoneOpen,
}

/// Meeting store port.
///
/// Date and code uniqueness among active meetings, and the single open
/// interval per user and meeting, are guaranteed by the store; conflicts come
/// back as outcome variants rather than errors.
#[async_trait]
pub trait MeetingsRepository: Send + Sync {
    async fn find_by_date(
        &self,
        date: DateTime<Utc>,
        visibility: Visibility,
    ) -> anyhow::Result<Option<Meeting>>;

    async fn find_by_id(&self, id: Uuid, visibility: Visibility)
        -> anyhow::Result<Option<Meeting>>;

    /// Active meetings only; `exclude_id` skips one meeting.
    async fn find_by_code(
        &self,
        code: &str,
        exclude_id: Option<Uuid>,
    ) -> anyhow::Result<Option<Meeting>>;

    /// Newest date first.
    async fn list(&self, visibility: Visibility) -> anyhow::Result<Vec<Meeting>>;

    async fn insert(&self, meeting: NewMeeting) -> anyhow::Result<InsertOutcome>;

    async fn update_fields(&self, id: Uuid, fields: MeetingFields)
        -> anyhow::Result<UpdateOutcome>;

    /// Open an interval unless the user already has one open. Atomic.
    async fn append_attendance(
        &self,
        meeting_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> anyhow::Result<AppendOutcome>;

    /// Close the user's earliest-started open interval. Atomic.
    async fn close_attendance(
        &self,
        meeting_id: Uuid,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> anyhow::Result<CloseOutcome>;
}
