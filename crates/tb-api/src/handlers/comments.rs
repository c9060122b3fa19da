//! Comment handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tb_core::Id;
use tb_models::{CreateCommentRequest, UpdateCommentRequest};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, AppState, AuthenticatedUser, Pagination};
use crate::representers;

/// GET /api/v1/tasks/:id/comments
pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(task_id): ApiPath<Id>,
    pagination: Pagination,
) -> ApiResult<impl IntoResponse> {
    let result = state
        .services
        .comments
        .list(&user, task_id, pagination.page())
        .await?;
    let path = format!("/tasks/{task_id}/comments");
    Ok(Json(representers::page(result, &path, representers::comment)))
}

/// POST /api/v1/tasks/:id/comments
pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(task_id): ApiPath<Id>,
    ApiJson(request): ApiJson<CreateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let comment = state
        .services
        .comments
        .create(&user, task_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(representers::comment(comment))))
}

/// PATCH /api/v1/comments/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(request): ApiJson<UpdateCommentRequest>,
) -> ApiResult<impl IntoResponse> {
    let comment = state.services.comments.update(&user, id, request).await?;
    Ok(Json(representers::comment(comment)))
}

/// DELETE /api/v1/comments/:id
pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<StatusCode> {
    state.services.comments.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
