use axum::http::StatusCode;
use modkit::api::problem::{Problem, ProblemResponse};

use crate::domain::error::DomainError;

/// Build a `ProblemResponse` with the module's type/code conventions.
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.rollcall.dev/{code}"))
        .with_code(code)
        .with_instance(instance);

    let problem = match tracing::Span::current().id() {
        Some(id) => problem.with_trace_id(id.into_u64().to_string()),
        None => problem,
    };

    ProblemResponse(problem)
}

/// Map domain error to RFC 9457 `ProblemResponse`.
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::UserNotFound { .. } => from_parts(
            StatusCode::NOT_FOUND,
            "ACCOUNTS_NOT_FOUND",
            "User not found",
            e.to_string(),
            instance,
        ),
        DomainError::UsernameTaken { .. } => from_parts(
            StatusCode::CONFLICT,
            "ACCOUNTS_USERNAME_CONFLICT",
            "Username already taken",
            e.to_string(),
            instance,
        ),
        DomainError::EmailTaken { .. } => from_parts(
            StatusCode::CONFLICT,
            "ACCOUNTS_EMAIL_CONFLICT",
            "Email already registered",
            e.to_string(),
            instance,
        ),
        DomainError::InvalidUsername { .. }
        | DomainError::InvalidEmail { .. }
        | DomainError::PasswordTooShort { .. }
        | DomainError::NoChanges => from_parts(
            StatusCode::BAD_REQUEST,
            "ACCOUNTS_VALIDATION",
            "Validation error",
            e.to_string(),
            instance,
        ),
        DomainError::InvalidCredentials | DomainError::InvalidToken { .. } => from_parts(
            StatusCode::UNAUTHORIZED,
            "ACCOUNTS_UNAUTHORIZED",
            "Unauthorized",
            e.to_string(),
            instance,
        ),
        DomainError::Forbidden { .. } => from_parts(
            StatusCode::FORBIDDEN,
            "ACCOUNTS_FORBIDDEN",
            "Forbidden",
            e.to_string(),
            instance,
        ),
        DomainError::Credentials { .. } => {
            tracing::error!(error = ?e, "Credential backend error");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "ACCOUNTS_INTERNAL",
                "Internal error",
                "An internal error occurred",
                instance,
            )
        }
        DomainError::Database { .. } => {
            tracing::error!(error = ?e, "Database error occurred");
            from_parts(
                StatusCode::SERVICE_UNAVAILABLE,
                "ACCOUNTS_UNAVAILABLE",
                "Service unavailable",
                "The identity store is unavailable",
                instance,
            )
        }
    }
}
