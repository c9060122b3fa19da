//! Task handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tb_core::Id;
use tb_models::{AssignTaskRequest, ChangeStatusRequest, CreateTaskRequest, UpdateTaskRequest};
use tb_queries::{TaskQuery, TaskQueryParams};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser};
use crate::representers;

/// GET /api/v1/tasks
///
/// Filters, sort and page come from the query string; see [`TaskQueryParams`].
pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(params): ApiQuery<TaskQueryParams>,
) -> ApiResult<impl IntoResponse> {
    let query = TaskQuery::parse(&params)?;
    let result = state.services.tasks.list(&user, query).await?;
    Ok(Json(representers::page(
        result,
        &params.link_base("/tasks"),
        representers::task,
    )))
}

/// POST /api/v1/tasks
pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<CreateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let task = state.services.tasks.create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(representers::task(task))))
}

/// GET /api/v1/tasks/:id
pub async fn get(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    let task = state.services.tasks.get(&user, id).await?;
    Ok(Json(representers::task(task)))
}

/// PATCH /api/v1/tasks/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(request): ApiJson<UpdateTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let task = state.services.tasks.update(&user, id, request).await?;
    Ok(Json(representers::task(task)))
}

/// PUT /api/v1/tasks/:id/assignee
pub async fn assign(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(request): ApiJson<AssignTaskRequest>,
) -> ApiResult<impl IntoResponse> {
    let task = state.services.tasks.assign(&user, id, request).await?;
    Ok(Json(representers::task(task)))
}

/// PUT /api/v1/tasks/:id/status
pub async fn change_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(request): ApiJson<ChangeStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    let task = state.services.tasks.change_status(&user, id, request).await?;
    Ok(Json(representers::task(task)))
}

/// DELETE /api/v1/tasks/:id
pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<StatusCode> {
    state.services.tasks.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
