//! Activity feed handlers

use axum::{extract::State, response::IntoResponse, Json};
use tb_core::Id;

use crate::error::ApiResult;
use crate::extractors::{ApiPath, AppState, AuthenticatedUser, Pagination};
use crate::representers;

/// GET /api/v1/workspaces/:id/activity
pub async fn workspace(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(workspace_id): ApiPath<Id>,
    pagination: Pagination,
) -> ApiResult<impl IntoResponse> {
    let result = state
        .services
        .activity
        .workspace_feed(&user, workspace_id, pagination.page())
        .await?;
    let path = format!("/workspaces/{workspace_id}/activity");
    Ok(Json(representers::page(result, &path, representers::activity)))
}

/// GET /api/v1/tasks/:id/activity
pub async fn task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(task_id): ApiPath<Id>,
    pagination: Pagination,
) -> ApiResult<impl IntoResponse> {
    let result = state
        .services
        .activity
        .task_feed(&user, task_id, pagination.page())
        .await?;
    let path = format!("/tasks/{task_id}/activity");
    Ok(Json(representers::page(result, &path, representers::activity)))
}

/// GET /api/v1/activity/me
pub async fn mine(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    pagination: Pagination,
) -> ApiResult<impl IntoResponse> {
    let result = state
        .services
        .activity
        .my_feed(&user, pagination.page())
        .await?;
    Ok(Json(representers::page(
        result,
        "/activity/me",
        representers::activity,
    )))
}
