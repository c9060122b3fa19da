//! Category handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tb_core::Id;
use tb_models::{CreateCategoryRequest, UpdateCategoryRequest};

use crate::error::ApiResult;
use crate::extractors::{ApiJson, ApiPath, AppState, AuthenticatedUser};
use crate::representers;

/// GET /api/v1/workspaces/:id/categories
pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(workspace_id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    let categories = state.services.categories.list(&user, workspace_id).await?;
    let path = format!("/workspaces/{workspace_id}/categories");
    Ok(Json(representers::all(categories, &path, representers::category)))
}

/// POST /api/v1/workspaces/:id/categories
pub async fn create(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(workspace_id): ApiPath<Id>,
    ApiJson(request): ApiJson<CreateCategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let category = state
        .services
        .categories
        .create(&user, workspace_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(representers::category(category))))
}

/// PATCH /api/v1/categories/:id
pub async fn update(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
    ApiJson(request): ApiJson<UpdateCategoryRequest>,
) -> ApiResult<impl IntoResponse> {
    let category = state.services.categories.update(&user, id, request).await?;
    Ok(Json(representers::category(category)))
}

/// DELETE /api/v1/categories/:id
pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<StatusCode> {
    state.services.categories.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
