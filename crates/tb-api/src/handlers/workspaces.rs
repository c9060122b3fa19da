//! Workspace handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tb_core::Id;
use tb_models::{CreateWorkspaceRequest, UpdateWorkspaceRequest};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, AppState, AuthenticatedUser};
use crate::representers;

/// GET /api/v1/workspaces
pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let workspaces = state.services.workspaces.list(&user).await?;
    Ok(Json(representers::all(
        workspaces,
        "/workspaces",
        representers::workspace_with_role,
    )))
}

/// POST /api/v1/workspaces
pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<CreateWorkspaceRequest>,
) -> ApiResult<impl IntoResponse> {
    let workspace = state.services.workspaces.create(&user, request).await?;
    Ok((StatusCode::CREATED, Json(representers::workspace(workspace))))
}

/// GET /api/v1/workspaces/:id
pub async fn get(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    let workspace = state.services.workspaces.get(&user, id).await?;
    Ok(Json(representers::workspace_with_role(workspace)))
}

/// PATCH /api/v1/workspaces/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(request): ApiJson<UpdateWorkspaceRequest>,
) -> ApiResult<impl IntoResponse> {
    let workspace = state.services.workspaces.update(&user, id, request).await?;
    Ok(Json(representers::workspace(workspace)))
}

/// DELETE /api/v1/workspaces/:id
pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<StatusCode> {
    state.services.workspaces.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
