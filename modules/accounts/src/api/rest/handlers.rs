use std::sync::Arc;

use axum::{
    extract::Path,
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use modkit::{api::problem::ProblemResponse, AdminOnly, Authenticated};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::rest::dto::{LoginReq, RegisterReq, TokenDto, UpdateUserReq, UserDto, UserListDto};
use crate::api::rest::error::map_domain_error;
use crate::domain::service::Service;

pub async fn register(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Json(req_body): Json<RegisterReq>,
) -> Result<(StatusCode, Json<UserDto>), ProblemResponse> {
    info!("Registering user: {}", req_body.username);

    match svc.register(req_body.into()).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(UserDto::from(user)))),
        Err(e) => {
            error!("Failed to register user: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn login(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Json(req_body): Json<LoginReq>,
) -> Result<Json<TokenDto>, ProblemResponse> {
    match svc.login(&req_body.email, &req_body.password).await {
        Ok(token) => Ok(Json(TokenDto::from(token))),
        Err(e) => {
            info!("Login rejected: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn list_users(
    uri: Uri,
    AdminOnly(_admin): AdminOnly,
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Json<UserListDto>, ProblemResponse> {
    match svc.list_users().await {
        Ok(users) => Ok(Json(UserListDto::new(users))),
        Err(e) => {
            error!("Failed to list users: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn me(
    uri: Uri,
    Authenticated(caller): Authenticated,
    Extension(svc): Extension<Arc<Service>>,
) -> Result<Json<UserDto>, ProblemResponse> {
    svc.get_user(caller.user_id)
        .await
        .map(|u| Json(UserDto::from(u)))
        .map_err(|e| map_domain_error(&e, uri.path()))
}

pub async fn get_user(
    uri: Uri,
    Authenticated(_caller): Authenticated,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDto>, ProblemResponse> {
    match svc.get_user(id).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            error!("Failed to get user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn update_user(
    uri: Uri,
    Authenticated(caller): Authenticated,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    Json(req_body): Json<UpdateUserReq>,
) -> Result<Json<UserDto>, ProblemResponse> {
    info!("Updating user {}", id);

    match svc.update_user(id, req_body.into(), &caller).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            error!("Failed to update user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn delete_user(
    uri: Uri,
    Authenticated(caller): Authenticated,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ProblemResponse> {
    info!("Deleting user {}", id);

    match svc.soft_delete(id, &caller).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e) => {
            error!("Failed to delete user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

pub async fn recover_user(
    uri: Uri,
    AdminOnly(_admin): AdminOnly,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDto>, ProblemResponse> {
    info!("Recovering user {}", id);

    match svc.recover(id).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            error!("Failed to recover user {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}
