use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    client::MeetingsApi,
    error::MeetingsError,
    model::{AttendanceCommand, AttendanceInterval, CalendarDate, Meeting, MeetingKey},
};
use crate::domain::service::Service;

/// Local implementation of the MeetingsApi trait that delegates to the domain service.
pub struct MeetingsLocalClient {
    service: Arc<Service>,
}

impl MeetingsLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl MeetingsApi for MeetingsLocalClient {
    async fn create_meeting(&self, date: CalendarDate) -> Result<Meeting, MeetingsError> {
        self.service.create_meeting(date).await.map_err(Into::into)
    }

    async fn get_meeting(&self, key: MeetingKey) -> Result<Meeting, MeetingsError> {
        self.service.get(&key).await.map_err(Into::into)
    }

    async fn list_meetings(&self, include_deleted: bool) -> Result<Vec<Meeting>, MeetingsError> {
        self.service
            .list_meetings(include_deleted)
            .await
            .map_err(Into::into)
    }

    async fn start_attendance(
        &self,
        cmd: AttendanceCommand,
    ) -> Result<AttendanceInterval, MeetingsError> {
        self.service.start_attendance(cmd).await.map_err(Into::into)
    }

    async fn finish_attendance(
        &self,
        cmd: AttendanceCommand,
    ) -> Result<AttendanceInterval, MeetingsError> {
        self.service.finish_attendance(cmd).await.map_err(Into::into)
    }

    async fn attendance_of(
        &self,
        key: MeetingKey,
        user_id: Uuid,
    ) -> Result<Vec<AttendanceInterval>, MeetingsError> {
        self.service
            .attendance_of(&key, user_id)
            .await
            .map_err(Into::into)
    }
}
