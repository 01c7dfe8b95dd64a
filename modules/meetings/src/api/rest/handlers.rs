use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use modkit::{api::problem::ProblemResponse, AdminOnly, Authenticated};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::rest::dto::{
    parse_date, AttendanceDto, AttendanceReq, CreateMeetingReq, ListMeetingsQuery, MeetingDto,
    MeetingListDto, UpdateMeetingReq,
};
use crate::api::rest::error::map_domain_error;
use crate::domain::service::Service;

pub async fn create_meeting(
    uri: Uri,
    AdminOnly(admin): AdminOnly,
    Extension(svc): Extension<Arc<Service>>,
    Json(req_body): Json<CreateMeetingReq>,
) -> Result<(StatusCode, Json<MeetingDto>), ProblemResponse> {
    info!(admin_id = %admin.user_id, "Creating meeting for {}", req_body.date);

    let date = parse_date(&req_body.date).map_err(|e| map_domain_error(&e, uri.path()))?;
    match svc.create_meeting(date).await {
        Ok(meeting) => Ok((StatusCode::CREATED, Json(MeetingDto::from(meeting)))),
        Err(e) => {
            error!("Failed to create meeting: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn list_meetings(
    uri: Uri,
    AdminOnly(_admin): AdminOnly,
    Extension(svc): Extension<Arc<Service>>,
    Query(query): Query<ListMeetingsQuery>,
) -> Result<Json<MeetingListDto>, ProblemResponse> {
    match svc.list_meetings(query.include_deleted).await {
        Ok(meetings) => Ok(Json(MeetingListDto::new(meetings))),
        Err(e) => {
            error!("Failed to list meetings: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn get_by_date(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(date): Path<String>,
) -> Result<Json<MeetingDto>, ProblemResponse> {
    let date = parse_date(&date).map_err(|e| map_domain_error(&e, uri.path()))?;
    svc.get_by_date(date)
        .await
        .map(|m| Json(MeetingDto::from(m)))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

pub async fn get_by_code(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(code): Path<String>,
) -> Result<Json<MeetingDto>, ProblemResponse> {
    svc.get_by_code(&code)
        .await
        .map(|m| Json(MeetingDto::from(m)))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

pub async fn get_by_id(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MeetingDto>, ProblemResponse> {
    svc.get_by_id(id)
        .await
        .map(|m| Json(MeetingDto::from(m)))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

pub async fn update_meeting(
    uri: Uri,
    AdminOnly(_admin): AdminOnly,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    Json(req_body): Json<UpdateMeetingReq>,
) -> Result<Json<MeetingDto>, ProblemResponse> {
    info!("Updating meeting {}", id);

    let patch = req_body
        .into_patch()
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    match svc.update_meeting(id, patch).await {
        Ok(meeting) => Ok(Json(MeetingDto::from(meeting))),
        Err(e) => {
            error!("Failed to update meeting {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn regenerate_code(
    uri: Uri,
    AdminOnly(_admin): AdminOnly,
    Extension(svc): Extension<Arc<Service>>,
    Path(date): Path<String>,
) -> Result<Json<MeetingDto>, ProblemResponse> {
    let date = parse_date(&date).map_err(|e| map_domain_error(&e, uri.path()))?;
    match svc.update_code(date).await {
        Ok(meeting) => Ok(Json(MeetingDto::from(meeting))),
        Err(e) => {
            error!("Failed to regenerate code for {}: {}", date, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn delete_meeting(
    uri: Uri,
    AdminOnly(_admin): AdminOnly,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ProblemResponse> {
    info!("Deleting meeting {}", id);

    match svc.soft_delete(id).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to delete meeting {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn recover_meeting(
    uri: Uri,
    AdminOnly(_admin): AdminOnly,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MeetingDto>, ProblemResponse> {
    info!("Recovering meeting {}", id);

    match svc.recover(id).await {
        Ok(meeting) => Ok(Json(MeetingDto::from(meeting))),
        Err(e) => {
            error!("Failed to recover meeting {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn start_attendance(
    uri: Uri,
    Authenticated(caller): Authenticated,
    Extension(svc): Extension<Arc<Service>>,
    Json(req_body): Json<AttendanceReq>,
) -> Result<(StatusCode, Json<AttendanceDto>), ProblemResponse> {
    let cmd = req_body
        .into_command(&caller)
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    match svc.start_attendance(cmd).await {
        Ok(interval) => Ok((StatusCode::CREATED, Json(AttendanceDto::from(interval)))),
        Err(e) => {
            info!("Attendance start rejected: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn finish_attendance(
    uri: Uri,
    Authenticated(caller): Authenticated,
    Extension(svc): Extension<Arc<Service>>,
    Json(req_body): Json<AttendanceReq>,
) -> Result<Json<AttendanceDto>, ProblemResponse> {
    let cmd = req_body
        .into_command(&caller)
        .map_err(|e| map_domain_error(&e, uri.path()))?;
    match svc.finish_attendance(cmd).await {
        Ok(interval) => Ok(Json(AttendanceDto::from(interval))),
        Err(e) => {
            info!("Attendance finish rejected: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}
