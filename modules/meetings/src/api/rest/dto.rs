use chrono::{DateTime, Utc};
use modkit::Caller;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::model::{
    AttendanceCommand, AttendanceInterval, CalendarDate, Meeting, MeetingKey, MeetingPatch,
};
use crate::domain::error::DomainError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingDto {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub code: String,
    pub attendance: Vec<AttendanceDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceDto {
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingListDto {
    pub meetings: Vec<MeetingDto>,
    pub total: usize,
}

/// `date` is `YYYY-MM-DD` or an RFC 3339 timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMeetingReq {
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateMeetingReq {
    pub date: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ListMeetingsQuery {
    #[serde(default)]
    pub include_deleted: bool,
}

/// Start/finish request. The meeting is named by id, date or join code (first
/// present wins); `user_id` defaults to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AttendanceReq {
    pub meeting_id: Option<Uuid>,
    pub date: Option<String>,
    pub meeting_code: Option<String>,
    pub user_id: Option<Uuid>,
}

impl From<AttendanceInterval> for AttendanceDto {
    fn from(a: AttendanceInterval) -> Self {
        Self {
            user_id: a.user_id,
            start_time: a.start_time,
            end_time: a.end_time,
        }
    }
}

impl From<Meeting> for MeetingDto {
    fn from(m: Meeting) -> Self {
        Self {
            id: m.id,
            date: m.date,
            code: m.code,
            attendance: m.attendance.into_iter().map(Into::into).collect(),
            created_at: m.created_at,
            updated_at: m.updated_at,
            deleted_at: m.deleted_at,
        }
    }
}

impl MeetingListDto {
    pub fn new(meetings: Vec<Meeting>) -> Self {
        let meetings: Vec<MeetingDto> = meetings.into_iter().map(Into::into).collect();
        Self {
            total: meetings.len(),
            meetings,
        }
    }
}

pub fn parse_date(raw: &str) -> Result<CalendarDate, DomainError> {
    raw.parse::<CalendarDate>().map_err(DomainError::from)
}

impl UpdateMeetingReq {
    pub fn into_patch(self) -> Result<MeetingPatch, DomainError> {
        Ok(MeetingPatch {
            date: self.date.as_deref().map(parse_date).transpose()?,
            code: self.code,
        })
    }
}

impl AttendanceReq {
    pub fn into_command(self, caller: &Caller) -> Result<AttendanceCommand, DomainError> {
        let meeting = match (self.meeting_id, self.date.as_deref(), &self.meeting_code) {
            (Some(id), _, _) => MeetingKey::Id(id),
            (None, Some(date), _) => MeetingKey::Date(parse_date(date)?),
            (None, None, Some(code)) => MeetingKey::Code(code.clone()),
            (None, None, None) => {
                return Err(DomainError::validation(
                    "one of meeting_id, date or meeting_code is required",
                ))
            }
        };
        let user_id = self.user_id.unwrap_or(caller.user_id);
        if !caller.may_act_for(user_id) {
            return Err(DomainError::forbidden(
                "only admins may record attendance for other users",
            ));
        }
        Ok(AttendanceCommand {
            meeting,
            user_id,
            meeting_code: self.meeting_code,
        })
    }
}
