use axum::http::StatusCode;
use modkit::api::problem::{Problem, ProblemResponse};

use crate::api::rest::dto::MeetingDto;
use crate::domain::error::{DomainError, ErrorKind};

/// Build a `Problem` with the module's type/code conventions.
pub fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> Problem {
    let problem = Problem::new(status, title, detail)
        .with_type(format!("https://errors.rollcall.dev/{code}"))
        .with_code(code)
        .with_instance(instance);

    match tracing::Span::current().id() {
        Some(id) => problem.with_trace_id(id.into_u64().to_string()),
        None => problem,
    }
}

pub fn status_of(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
        ErrorKind::ResourceExhausted | ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
    }
}

fn code_and_title(e: &DomainError) -> (&'static str, &'static str) {
    match e {
        DomainError::MeetingNotFound { .. } => ("MEETINGS_NOT_FOUND", "Meeting not found"),
        DomainError::UserNotFound { .. } => ("MEETINGS_USER_NOT_FOUND", "User not found"),
        DomainError::DuplicateMeeting { .. } => ("MEETINGS_DUPLICATE", "Meeting already exists"),
        DomainError::DateTaken { .. } => ("MEETINGS_DATE_CONFLICT", "Date already taken"),
        DomainError::CodeTaken { .. } => ("MEETINGS_CODE_CONFLICT", "Code already in use"),
        DomainError::ActiveAttendanceExists { .. } => {
            ("MEETINGS_ATTENDANCE_ACTIVE", "Attendance already started")
        }
        DomainError::NoAttendanceToFinish { .. } => {
            ("MEETINGS_NO_ATTENDANCE", "No attendance to finish")
        }
        DomainError::CodeGenerationExhausted { .. } => {
            ("MEETINGS_CODE_EXHAUSTED", "Could not allocate a meeting code")
        }
        DomainError::InvalidMeetingCode => ("MEETINGS_CODE_MISMATCH", "Invalid meeting code"),
        DomainError::InvalidDate(_) | DomainError::InvalidCode { .. } | DomainError::Validation { .. } => {
            ("MEETINGS_VALIDATION", "Validation error")
        }
        DomainError::Forbidden { .. } => ("MEETINGS_FORBIDDEN", "Forbidden"),
        DomainError::UserDirectory { .. } | DomainError::Database { .. } => {
            ("MEETINGS_UNAVAILABLE", "Service unavailable")
        }
    }
}

/// Map domain error to RFC 9457 `ProblemResponse`.
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    let (code, title) = code_and_title(e);
    let status = status_of(e.kind());

    let detail = match e.kind() {
        ErrorKind::Unavailable => {
            tracing::error!(error = ?e, "Backing store error");
            "A backing service is unavailable".to_string()
        }
        _ => e.to_string(),
    };

    let problem = from_parts(status, code, title, detail, instance);
    let problem = match e {
        DomainError::DuplicateMeeting { existing, .. } => {
            problem.with_extension("existing_meeting", MeetingDto::from((**existing).clone()))
        }
        _ => problem,
    };
    ProblemResponse(problem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn statuses_follow_error_kinds() {
        let cases = [
            (DomainError::meeting_not_found("x"), 404),
            (DomainError::code_taken("abcd"), 409),
            (DomainError::validation("no changes detected"), 400),
            (DomainError::NoAttendanceToFinish { user_id: Uuid::nil() }, 412),
            (DomainError::CodeGenerationExhausted { attempts: 10 }, 503),
            (DomainError::InvalidMeetingCode, 403),
            (DomainError::database("boom"), 503),
        ];
        for (e, status) in cases {
            assert_eq!(map_domain_error(&e, "/meetings").0.status, status, "{e:?}");
        }
    }

    #[test]
    fn unavailable_hides_internal_detail() {
        let p = map_domain_error(&DomainError::database("password=hunter2"), "/meetings").0;
        assert!(!p.detail.contains("hunter2"));
        assert_eq!(p.code, "MEETINGS_UNAVAILABLE");
    }
}
