//! Workspace membership handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tb_core::Id;
use tb_models::{InviteMemberRequest, TransferOwnershipRequest, UpdateMemberRoleRequest};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, AppState, AuthenticatedUser};
use crate::representers;

/// GET /api/v1/workspaces/:id/members
pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(workspace_id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    let members = state.services.members.list(&user, workspace_id).await?;
    let path = format!("/workspaces/{workspace_id}/members");
    Ok(Json(representers::all(
        members,
        &path,
        representers::member_with_user,
    )))
}

/// POST /api/v1/workspaces/:id/members
pub async fn invite(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(workspace_id): ApiPath<Id>,
    ApiJson(request): ApiJson<InviteMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    let member = state
        .services
        .members
        .invite(&user, workspace_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(representers::member(member))))
}

/// PATCH /api/v1/workspaces/:id/members/:user_id
pub async fn change_role(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath((workspace_id, user_id)): ApiPath<(Id, Id)>,
    ApiJson(request): ApiJson<UpdateMemberRoleRequest>,
) -> ApiResult<impl IntoResponse> {
    let member = state
        .services
        .members
        .change_role(&user, workspace_id, user_id, request)
        .await?;
    Ok(Json(representers::member(member)))
}

/// DELETE /api/v1/workspaces/:id/members/:user_id
pub async fn remove(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath((workspace_id, user_id)): ApiPath<(Id, Id)>,
) -> ApiResult<StatusCode> {
    state
        .services
        .members
        .remove(&user, workspace_id, user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/workspaces/:id/leave
pub async fn leave(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(workspace_id): ApiPath<Id>,
) -> ApiResult<StatusCode> {
    state.services.members.leave(&user, workspace_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/workspaces/:id/transfer
pub async fn transfer_ownership(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(workspace_id): ApiPath<Id>,
    ApiJson(request): ApiJson<TransferOwnershipRequest>,
) -> ApiResult<impl IntoResponse> {
    let workspace = state
        .services
        .members
        .transfer_ownership(&user, workspace_id, request)
        .await?;
    Ok(Json(representers::workspace(workspace)))
}
