use thiserror::Error;

use crate::contract::model::Meeting;

/// Stable error kinds exposed to other modules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeetingsError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// `existing` is set when a meeting already occupies the requested date.
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        existing: Option<Box<Meeting>>,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Precondition failed: {message}")]
    PreconditionFailed { message: String },

    #[error("Resource exhausted: {message}")]
    ResourceExhausted { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Service unavailable")]
    Unavailable,
}

impl MeetingsError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            existing: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

impl From<crate::domain::error::DomainError> for MeetingsError {
    fn from(e: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::{DomainError, ErrorKind};
        let message = e.to_string();
        match (e.kind(), e) {
            (_, DomainError::DuplicateMeeting { existing, .. }) => Self::Conflict {
                message,
                existing: Some(existing),
            },
            (ErrorKind::NotFound, _) => Self::NotFound { message },
            (ErrorKind::Conflict, _) => Self::Conflict {
                message,
                existing: None,
            },
            (ErrorKind::InvalidInput, _) => Self::InvalidInput { message },
            (ErrorKind::PreconditionFailed, _) => Self::PreconditionFailed { message },
            (ErrorKind::ResourceExhausted, _) => Self::ResourceExhausted { message },
            (ErrorKind::Forbidden, _) => Self::Forbidden { message },
            (ErrorKind::Unavailable, _) => Self::Unavailable,
        }
    }
}
