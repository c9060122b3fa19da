//! Axum extractors for API handlers

use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequest, FromRequestParts, Query},
    http::{header, request::Parts},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tb_auth::{extract_bearer_token, CurrentUser, RateLimiter, SessionStore, TokenType};
use tb_core::{config::AppConfig, PaginationParams};
use tb_db::Pagination as PageRequest;
use tb_services::{Services, Stores};

use crate::error::ApiError;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub stores: Stores,
    pub sessions: Arc<dyn SessionStore>,
    pub config: Arc<AppConfig>,
    pub limits: RateLimits,
}

/// Request limiters; `None` when rate limiting is switched off
#[derive(Clone)]
pub struct RateLimits {
    pub global: Option<Arc<RateLimiter>>,
    pub auth: Option<Arc<RateLimiter>>,
    /// Peers allowed to name the client in `X-Forwarded-For`
    pub trusted_proxies: Arc<[IpAddr]>,
}

impl RateLimits {
    pub fn from_config(config: &AppConfig) -> Self {
        if !config.rate_limit.enabled {
            return Self::disabled();
        }
        Self {
            global: Some(Arc::new(RateLimiter::global(&config.rate_limit))),
            auth: Some(Arc::new(RateLimiter::auth(&config.rate_limit))),
            trusted_proxies: config.rate_limit.trusted_proxy_ips().into(),
        }
    }

    pub fn disabled() -> Self {
        Self {
            global: None,
            auth: None,
            trusted_proxies: Arc::from(Vec::new()),
        }
    }
}

impl AppState {
    pub fn new(
        config: AppConfig,
        stores: Stores,
        services: Services,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let limits = RateLimits::from_config(&config);
        Self {
            services,
            stores,
            sessions,
            config: Arc::new(config),
            limits,
        }
    }
}

/// The caller behind a valid access token, with their active workspace roles
pub struct AuthenticatedUser(pub CurrentUser);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        let claims = state
            .services
            .auth
            .jwt()
            .validate(token, TokenType::Access)?;
        let user_id = claims.user_id()?;

        let user = state
            .stores
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid token"))?;
        if user.token_version != claims.ver {
            return Err(ApiError::unauthorized("Token has been revoked"));
        }

        let roles = state.stores.members.active_roles_for_user(user.id).await?;
        tracing::debug!(user_id = user.id, workspaces = roles.len(), "Authenticated request");

        Ok(AuthenticatedUser(
            CurrentUser::new(user.id, user.name, user.email).with_roles(roles),
        ))
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = CurrentUser;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// `offset`/`pageSize` query parameters; malformed values fall back to the defaults
pub struct Pagination(pub PaginationParams);

impl Pagination {
    /// LIMIT/OFFSET for the repositories
    pub fn page(&self) -> PageRequest {
        PageRequest::from(self.0)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Pagination
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<PaginationParams>::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|_| Query(PaginationParams::default()));
        Ok(Pagination(params.normalized()))
    }
}

impl std::ops::Deref for Pagination {
    type Target = PaginationParams;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// `axum::Json` with rejections in the API error format
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl<T: Serialize> IntoResponse for ApiJson<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// `axum::extract::Query` with rejections in the API error format
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `axum::extract::Path` with rejections in the API error format
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
