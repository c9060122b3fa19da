//! API error handling
//!
//! Every failure leaves the API as the same JSON body:
//!
//! ```json
//! {
//!   "_type": "Error",
//!   "errorIdentifier": "urn:taskboard:api:errors:NotFound",
//!   "message": "Task with id 7 not found",
//!   "details": { "title": ["can't be blank"] }
//! }
//! ```

use std::collections::BTreeMap;

use axum::{
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tb_auth::JwtError;
use tb_core::{TbError, ValidationErrors};
use tb_db::RepositoryError;

const INTERNAL_MESSAGE: &str = "An internal error occurred";

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Validation(ValidationErrors),
    Unauthorized(String),
    Forbidden(String),
    BadRequest(String),
    Conflict(String),
    RateLimited { retry_after_seconds: u64 },
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Unauthorized(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Last segment of the `errorIdentifier` URN
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::Validation(_) => "PropertyConstraintViolation",
            ApiError::Unauthorized(_) => "Unauthenticated",
            ApiError::Forbidden(_) => "MissingPermission",
            ApiError::BadRequest(_) => "InvalidRequestBody",
            ApiError::Conflict(_) => "Conflict",
            ApiError::RateLimited { .. } => "TooManyRequests",
            ApiError::BadGateway(_) => "ExternalServiceError",
            ApiError::Internal(_) => "InternalError",
        }
    }

    fn body(&self) -> ErrorBody {
        let (message, details) = match self {
            ApiError::Validation(errors) => {
                let mut details = errors.errors.clone();
                if !errors.base_errors.is_empty() {
                    details.insert("base".into(), errors.base_errors.clone());
                }
                (errors.full_messages().join(", "), Some(details))
            }
            ApiError::RateLimited {
                retry_after_seconds,
            } => (
                format!("Too many requests, retry in {retry_after_seconds} seconds"),
                None,
            ),
            ApiError::Internal(_) => (INTERNAL_MESSAGE.to_string(), None),
            ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::BadGateway(msg) => (msg.clone(), None),
        };

        ErrorBody {
            type_name: "Error",
            error_identifier: format!("urn:taskboard:api:errors:{}", self.kind()),
            message,
            details,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(rename = "_type")]
    type_name: &'static str,
    error_identifier: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<BTreeMap<String, Vec<String>>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            tracing::error!(error = %detail, "Request failed");
        }

        let status = self.status_code();
        let mut response = (status, Json(self.body())).into_response();
        if let ApiError::RateLimited {
            retry_after_seconds,
        } = self
        {
            let headers = response.headers_mut();
            headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after_seconds));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(0u32));
        }
        response
    }
}

impl From<TbError> for ApiError {
    fn from(err: TbError) -> Self {
        match err {
            TbError::NotFound {
                entity,
                field,
                value,
            } => {
                if field == "id" {
                    ApiError::NotFound(format!("{entity} with id {value} not found"))
                } else {
                    ApiError::NotFound(format!("{entity} not found"))
                }
            }
            TbError::Unauthorized { message } => ApiError::Unauthorized(message),
            TbError::Forbidden { message } => ApiError::Forbidden(message),
            TbError::Validation(errors) => ApiError::Validation(errors),
            TbError::Conflict { message } => ApiError::Conflict(message),
            TbError::RateLimited {
                retry_after_seconds,
            } => ApiError::RateLimited {
                retry_after_seconds,
            },
            TbError::ExternalService { service, message } => {
                tracing::warn!(service = %service, error = %message, "External service failed");
                ApiError::BadGateway(format!("{service} is unavailable"))
            }
            TbError::Database(message) | TbError::Internal(message) | TbError::Config(message) => {
                ApiError::Internal(message)
            }
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        TbError::from(err).into()
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        TbError::from(err).into()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
