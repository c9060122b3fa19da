//! Subtask handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tb_core::Id;
use tb_models::{CreateSubTaskRequest, UpdateSubTaskRequest};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, AppState, AuthenticatedUser};
use crate::representers;

/// GET /api/v1/tasks/:id/subtasks
pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(task_id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    let subtasks = state.services.subtasks.list(&user, task_id).await?;
    let path = format!("/tasks/{task_id}/subtasks");
    Ok(Json(representers::all(subtasks, &path, representers::subtask)))
}

/// POST /api/v1/tasks/:id/subtasks
pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(task_id): ApiPath<Id>,
    ApiJson(request): ApiJson<CreateSubTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let subtask = state
        .services
        .subtasks
        .create(&user, task_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(representers::subtask(subtask))))
}

/// PATCH /api/v1/subtasks/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(request): ApiJson<UpdateSubTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let subtask = state.services.subtasks.update(&user, id, request).await?;
    Ok(Json(representers::subtask(subtask)))
}

/// POST /api/v1/subtasks/:id/toggle
pub async fn toggle(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    let subtask = state.services.subtasks.toggle(&user, id).await?;
    Ok(Json(representers::subtask(subtask)))
}

/// DELETE /api/v1/subtasks/:id
pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<StatusCode> {
    state.services.subtasks.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
