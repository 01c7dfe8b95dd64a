use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::contract::model::{InvalidDate, Meeting};

/// Coarse classification shared by the contract and REST mappings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    PreconditionFailed,
    ResourceExhausted,
    Forbidden,
    Unavailable,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Meeting not found: {key}")]
    MeetingNotFound { key: String },

    /// `day` is the calendar day in the reference timezone.
    #[error("A meeting already exists for {day}")]
    DuplicateMeeting { existing: Box<Meeting>, day: NaiveDate },

    #[error("Another meeting already uses date {day}")]
    DateTaken { day: NaiveDate },

    #[error("Meeting code '{code}' is already in use")]
    CodeTaken { code: String },

    #[error("Could not generate a unique meeting code after {attempts} attempts")]
    CodeGenerationExhausted { attempts: u32 },

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: Uuid },

    #[error("User {user_id} already has an open attendance in this meeting")]
    ActiveAttendanceExists { user_id: Uuid },

    #[error("User {user_id} has no open attendance to finish")]
    NoAttendanceToFinish { user_id: Uuid },

    #[error("Meeting code does not match")]
    InvalidMeetingCode,

    #[error(transparent)]
    InvalidDate(#[from] InvalidDate),

    #[error("Invalid meeting code: {message}")]
    InvalidCode { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("User directory error: {message}")]
    UserDirectory { message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn meeting_not_found(key: impl ToString) -> Self {
        Self::MeetingNotFound {
            key: key.to_string(),
        }
    }

    pub fn duplicate_meeting(existing: Meeting, day: NaiveDate) -> Self {
        Self::DuplicateMeeting {
            existing: Box::new(existing),
            day,
        }
    }

    pub fn code_taken(code: impl Into<String>) -> Self {
        Self::CodeTaken { code: code.into() }
    }

    pub fn invalid_code(message: impl Into<String>) -> Self {
        Self::InvalidCode {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn user_directory(message: impl Into<String>) -> Self {
        Self::UserDirectory {
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MeetingNotFound { .. } | Self::UserNotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateMeeting { .. }
            | Self::DateTaken { .. }
            | Self::CodeTaken { .. }
            | Self::ActiveAttendanceExists { .. } => ErrorKind::Conflict,
            Self::InvalidDate(_) | Self::InvalidCode { .. } | Self::Validation { .. } => {
                ErrorKind::InvalidInput
            }
            Self::NoAttendanceToFinish { .. } => ErrorKind::PreconditionFailed,
            Self::CodeGenerationExhausted { .. } => ErrorKind::ResourceExhausted,
            Self::InvalidMeetingCode | Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::UserDirectory { .. } | Self::Database { .. } => ErrorKind::Unavailable,
        }
    }
}
