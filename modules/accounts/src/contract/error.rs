use thiserror::Error;

/// Errors that are safe to expose to other modules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountsError {
    #[error("User not found: {key}")]
    NotFound { key: String },

    #[error("{field} '{value}' is already taken")]
    Conflict { field: &'static str, value: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Internal error")]
    Internal,
}

impl AccountsError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn conflict(field: &'static str, value: impl Into<String>) -> Self {
        Self::Conflict {
            field,
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::Internal
    }
}

impl From<crate::domain::error::DomainError> for AccountsError {
    fn from(domain_error: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match domain_error {
            UserNotFound { key } => Self::not_found(key),
            UsernameTaken { username } => Self::conflict("username", username),
            EmailTaken { email } => Self::conflict("email", email),
            e @ (InvalidUsername { .. } | InvalidEmail { .. } | PasswordTooShort { .. } | NoChanges) => {
                Self::validation(e.to_string())
            }
            InvalidCredentials => Self::unauthorized("invalid credentials"),
            InvalidToken { message } => Self::unauthorized(message),
            Forbidden { message } => Self::Forbidden { message },
            Database { .. } | Credentials { .. } => Self::internal(),
        }
    }
}
