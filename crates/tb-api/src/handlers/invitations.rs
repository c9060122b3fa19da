//! Pending invitations of the current user

use axum::{extract::State, response::IntoResponse, Json};
use tb_core::Id;

use crate::error::ApiResult;
use crate::extractors::{ApiPath, AppState, AuthenticatedUser};
use crate::representers;

/// GET /api/v1/invitations
pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let invitations = state.services.members.my_invitations(&user).await?;
    Ok(Json(representers::all(
        invitations,
        "/invitations",
        representers::invitation,
    )))
}

/// POST /api/v1/invitations/:workspace_id/accept
pub async fn accept(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(workspace_id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    let member = state.services.members.accept(&user, workspace_id).await?;
    Ok(Json(representers::member(member)))
}

/// POST /api/v1/invitations/:workspace_id/decline
pub async fn decline(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(workspace_id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    let member = state.services.members.decline(&user, workspace_id).await?;
    Ok(Json(representers::member(member)))
}
