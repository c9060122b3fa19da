//! User handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Deserialize;
use tb_models::{ChangePasswordRequest, UpdateProfileRequest};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiQuery, AppState, AuthenticatedUser};
use crate::representers;

/// GET /api/v1/users/me
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let profile = state.services.users.profile(&user).await?;
    Ok(Json(representers::user(profile)))
}

/// PATCH /api/v1/users/me
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    let profile = state.services.users.update_profile(&user, request).await?;
    Ok(Json(representers::user(profile)))
}

/// PUT /api/v1/users/me/password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    state.services.users.change_password(&user, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/users/me
pub async fn delete_me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<StatusCode> {
    state.services.users.delete_account(&user).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// GET /api/v1/users/search?q=
pub async fn search(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> ApiResult<impl IntoResponse> {
    let users = state.services.users.search(&params.q).await?;
    Ok(Json(representers::all(
        users,
        "/users/search",
        representers::user_summary,
    )))
}
