//! Authentication handlers
//!
//! Access tokens go back in the response body. The refresh token is set as
//! an HttpOnly cookie scoped to `/api/v1/auth` and is also included in the
//! body for clients without a cookie jar.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tb_auth::{
    extract_cookie, CookieConfig, OAuthProvider, Session, TokenPair, REFRESH_COOKIE,
    SESSION_COOKIE,
};
use tb_core::TbError;
use tb_models::{LoginRequest, RefreshRequest, RegisterRequest, User};
use tb_services::AuthSession;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiPath, ApiQuery, AppState, AuthenticatedUser};
use crate::representers::{self, Resource};

const OAUTH_PROVIDER_KEY: &str = "oauth_provider";
const OAUTH_STATE_KEY: &str = "oauth_state";
const OAUTH_VERIFIER_KEY: &str = "oauth_pkce_verifier";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(rename = "_type")]
    type_name: &'static str,
    user: Resource<User>,
    #[serde(flatten)]
    tokens: TokenPair,
}

fn refresh_cookie(state: &AppState) -> CookieConfig {
    CookieConfig::refresh(
        state.config.auth.cookie_secure,
        state.config.auth.refresh_token_ttl_seconds,
    )
}

fn session_cookie(state: &AppState) -> CookieConfig {
    CookieConfig::session(
        state.config.auth.cookie_secure,
        state.config.auth.oauth_state_ttl_seconds,
    )
}

fn signed_in(state: &AppState, status: StatusCode, session: AuthSession) -> Response {
    let cookie = refresh_cookie(state).build_cookie(&session.tokens.refresh_token);
    let body = AuthResponse {
        type_name: "AuthSession",
        user: representers::user(session.user),
        tokens: session.tokens,
    };
    (status, AppendHeaders([(header::SET_COOKIE, cookie)]), Json(body)).into_response()
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| extract_cookie(cookies, name))
}

/// POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<Response> {
    let session = state.services.auth.register(request).await?;
    Ok(signed_in(&state, StatusCode::CREATED, session))
}

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Response> {
    let session = state.services.auth.login(request).await?;
    Ok(signed_in(&state, StatusCode::OK, session))
}

/// POST /api/v1/auth/refresh
///
/// The body's `refreshToken` wins over the cookie.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<Response> {
    let token = body
        .and_then(|Json(request)| request.refresh_token)
        .filter(|token| !token.is_empty())
        .or_else(|| cookie_value(&headers, REFRESH_COOKIE))
        .ok_or_else(|| ApiError::unauthorized("Refresh token required"))?;

    let session = state.services.auth.refresh(&token).await?;
    Ok(signed_in(&state, StatusCode::OK, session))
}

/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    state.services.auth.logout(user.id).await?;
    let cookie = refresh_cookie(&state).build_clear_cookie();
    Ok((
        StatusCode::NO_CONTENT,
        AppendHeaders([(header::SET_COOKIE, cookie)]),
    ))
}

/// GET /api/v1/auth/oauth/:provider
///
/// Stores the CSRF state and PKCE verifier in a short-lived session and
/// redirects the browser to the provider.
pub async fn oauth_start(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
) -> ApiResult<Response> {
    let (provider, pending) = state.services.auth.oauth_authorize(&provider)?;

    let session = Session::new(state.config.auth.oauth_state_ttl_seconds)
        .with(OAUTH_PROVIDER_KEY, provider.as_str())
        .with(OAUTH_STATE_KEY, pending.csrf_state)
        .with(OAUTH_VERIFIER_KEY, pending.pkce_verifier);
    let cookie = session_cookie(&state).build_cookie(&session.id);
    state.sessions.set(session);

    tracing::debug!(provider = %provider, "Starting OAuth login");
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to(&pending.url),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /api/v1/auth/oauth/:provider/callback
///
/// On success the browser lands on the frontend with the access token in
/// the URL fragment and the refresh token in its cookie.
pub async fn oauth_callback(
    State(state): State<AppState>,
    ApiPath(provider): ApiPath<String>,
    ApiQuery(params): ApiQuery<OAuthCallbackParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let frontend = state.config.server.frontend_url.trim_end_matches('/').to_string();
    let clear_session = session_cookie(&state).build_clear_cookie();

    if let Some(error) = params.error {
        tracing::info!(provider = %provider, error = %error, "OAuth login denied by provider");
        return Ok((
            AppendHeaders([(header::SET_COOKIE, clear_session)]),
            Redirect::to(&format!("{frontend}/login?error=oauth_denied")),
        )
            .into_response());
    }

    let expired = || ApiError::unauthorized("OAuth login expired, please try again");
    let session_id = cookie_value(&headers, SESSION_COOKIE).ok_or_else(expired)?;
    let session = state.sessions.take(&session_id).map_err(|_| expired())?;

    let provider: OAuthProvider = provider.parse().map_err(TbError::from)?;
    let state_matches = session.get(OAUTH_PROVIDER_KEY) == Some(provider.as_str())
        && params.state.is_some()
        && session.get(OAUTH_STATE_KEY) == params.state.as_deref();
    if !state_matches {
        tracing::warn!(provider = %provider, "OAuth state mismatch");
        return Err(ApiError::bad_request("Invalid OAuth state"));
    }

    let code = params
        .code
        .ok_or_else(|| ApiError::bad_request("Missing authorization code"))?;
    let verifier = session
        .get(OAUTH_VERIFIER_KEY)
        .ok_or_else(expired)?
        .to_string();

    let auth = state
        .services
        .auth
        .oauth_callback(provider, code, verifier)
        .await?;

    let refresh = refresh_cookie(&state).build_cookie(&auth.tokens.refresh_token);
    let target = format!(
        "{frontend}/oauth/callback#accessToken={}&expiresIn={}",
        auth.tokens.access_token, auth.tokens.expires_in
    );
    Ok((
        AppendHeaders([
            (header::SET_COOKIE, clear_session),
            (header::SET_COOKIE, refresh),
        ]),
        Redirect::to(&target),
    )
        .into_response())
}
