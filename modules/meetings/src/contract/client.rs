use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    error::MeetingsError,
    model::{AttendanceCommand, AttendanceInterval, CalendarDate, Meeting, MeetingKey},
};

/// In-process API of the meetings module, published to the `ClientHub`.
#[async_trait]
pub trait MeetingsApi: Send + Sync {
    async fn create_meeting(&self, date: CalendarDate) -> Result<Meeting, MeetingsError>;

    async fn get_meeting(&self, key: MeetingKey) -> Result<Meeting, MeetingsError>;

    async fn list_meetings(&self, include_deleted: bool) -> Result<Vec<Meeting>, MeetingsError>;

    async fn start_attendance(
        &self,
        cmd: AttendanceCommand,
    ) -> Result<AttendanceInterval, MeetingsError>;

    async fn finish_attendance(
        &self,
        cmd: AttendanceCommand,
    ) -> Result<AttendanceInterval, MeetingsError>;

    async fn attendance_of(
        &self,
        key: MeetingKey,
        user_id: Uuid,
    ) -> Result<Vec<AttendanceInterval>, MeetingsError>;
}
