//! Attachment handlers

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tb_attachments::sanitize_filename;
use tb_core::{Id, ValidationErrors};
use tb_services::Upload;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiPath, AppState, AuthenticatedUser};
use crate::representers;

/// Multipart field carrying the file
const FILE_FIELD: &str = "file";

/// GET /api/v1/tasks/:id/attachments
pub async fn list(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(task_id): ApiPath<Id>,
) -> ApiResult<impl IntoResponse> {
    let attachments = state.services.attachments.list(&user, task_id).await?;
    let path = format!("/tasks/{task_id}/attachments");
    Ok(Json(representers::all(
        attachments,
        &path,
        representers::attachment,
    )))
}

/// POST /api/v1/tasks/:id/attachments (multipart/form-data, field `file`)
pub async fn upload(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(task_id): ApiPath<Id>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("file").to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        upload = Some(Upload {
            filename,
            content_type,
            data,
        });
        break;
    }

    let upload = upload.ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.add(FILE_FIELD, "can't be blank");
        ApiError::Validation(errors)
    })?;

    let attachment = state
        .services
        .attachments
        .upload(&user, task_id, upload)
        .await?;
    Ok((StatusCode::CREATED, Json(representers::attachment(attachment))))
}

/// GET /api/v1/attachments/:id/download
pub async fn download(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<Response> {
    let (attachment, data) = state.services.attachments.download(&user, id).await?;

    let content_type = HeaderValue::from_str(&attachment.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(&attachment.filename)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = data.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, max-age=0"),
    );
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    Ok(response)
}

/// DELETE /api/v1/attachments/:id
pub async fn delete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiPath(id): ApiPath<Id>,
) -> ApiResult<StatusCode> {
    state.services.attachments.delete(&user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
