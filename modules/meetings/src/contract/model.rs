use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use uuid::Uuid;

/// A meeting held on one calendar date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meeting {
    pub id: Uuid,
    /// Midnight of the meeting day in the reference timezone, as UTC.
    pub date: DateTime<Utc>,
    pub code: String,
    /// Arrival order.
    pub attendance: Vec<AttendanceInterval>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Meeting {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Open intervals of one user, earliest first.
    pub fn open_intervals_of(&self, user_id: Uuid) -> impl Iterator<Item = &AttendanceInterval> {
        self.attendance
            .iter()
            .filter(move |a| a.user_id == user_id && a.is_open())
    }
}

/// A user's presence window inside a meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceInterval {
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl AttendanceInterval {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Caller-supplied date: a bare day, or any instant inside the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarDate {
    Day(NaiveDate),
    Instant(DateTime<FixedOffset>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unparsable date '{input}': expected YYYY-MM-DD or an RFC 3339 timestamp")]
pub struct InvalidDate {
    pub input: String,
}

impl FromStr for CalendarDate {
    type Err = InvalidDate;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(day) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(Self::Day(day));
        }
        DateTime::parse_from_rfc3339(s)
            .map(Self::Instant)
            .map_err(|_| InvalidDate {
                input: s.to_string(),
            })
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Day(d) => write!(f, "{d}"),
            Self::Instant(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

/// How a caller names a meeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingKey {
    Id(Uuid),
    Date(CalendarDate),
    Code(String),
}

impl fmt::Display for MeetingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Date(d) => write!(f, "date {d}"),
            Self::Code(c) => write!(f, "code {c}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MeetingPatch {
    pub date: Option<CalendarDate>,
    pub code: Option<String>,
}

/// Start or finish attendance for one user.
///
/// `meeting_code`, when present, must match the meeting's join code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceCommand {
    pub meeting: MeetingKey,
    pub user_id: Uuid,
    pub meeting_code: Option<String>,
}
