//! In-app notification handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tb_core::Id;

use crate::error::ApiResult;
use crate::extractors::{ApiPath, ApiQuery, AppState, AuthenticatedUser, Pagination};
use crate::representers;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    #[serde(rename = "_type")]
    type_name: &'static str,
    count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkedRead {
    #[serde(rename = "_type")]
    type_name: &'static str,
    updated: u64,
}

/// GET /api/v1/notifications?unreadOnly=true
pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiQuery(filter): ApiQuery<NotificationFilter>,
    pagination: Pagination,
) -> ApiResult<impl IntoResponse> {
    let result = state
        .services
        .notifications
        .list(&*user, filter.unread_only, pagination.page())
        .await?;
    let path = if filter.unread_only {
        "/notifications?unreadOnly=true"
    } else {
        "/notifications"
    };
    Ok(Json(representers::page(
        result,
        path,
        representers::notification,
    )))
}

/// GET /api/v1/notifications/unread_count
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let count = state.services.notifications.unread_count(&*user).await?;
    Ok(Json(UnreadCount {
        type_name: "UnreadCount",
        count,
    }))
}

/// POST /api/v1/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    let notification = state.services.notifications.mark_read(&*user, id).await?;
    Ok(Json(representers::notification(notification)))
}

/// POST /api/v1/notifications/read_all
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    let updated = state.services.notifications.mark_all_read(&*user).await?;
    Ok(Json(MarkedRead {
        type_name: "MarkedRead",
        updated,
    }))
}

/// DELETE /api/v1/notifications/:id
pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<StatusCode> {
    state.services.notifications.delete(&*user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
