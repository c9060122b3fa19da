//! API routes

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::extractors::AppState;
use crate::handlers::{
    activity, attachments, auth, categories, comments, invitations, members, notifications,
    subtasks, tasks, users, workspaces,
};
use crate::middleware::{rate_limit, RateLimitState};

pub const API_PREFIX: &str = "/api/v1";

/// Create the complete API router
pub fn router(state: AppState) -> Router {
    let mut api = Router::new()
        .route("/", get(api_root))
        .nest("/auth", auth_router(&state))
        .nest("/users", users_router())
        .nest("/workspaces", workspaces_router())
        .nest("/invitations", invitations_router())
        .nest("/categories", categories_router())
        .nest("/tasks", tasks_router())
        .nest("/subtasks", subtasks_router())
        .nest("/comments", comments_router())
        .nest("/attachments", attachments_router())
        .nest("/notifications", notifications_router())
        .route("/activity/me", get(activity::mine))
        .layer(DefaultBodyLimit::max(state.config.server.max_body_size_bytes));

    if let Some(limiter) = state.limits.global.clone() {
        let limit = RateLimitState::new(limiter, state.limits.trusted_proxies.clone());
        api = api.layer(middleware::from_fn_with_state(limit, rate_limit));
    }

    Router::new().nest(API_PREFIX, api).with_state(state)
}

fn auth_router(state: &AppState) -> Router<AppState> {
    let mut router = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/oauth/:provider", get(auth::oauth_start))
        .route("/oauth/:provider/callback", get(auth::oauth_callback));

    if let Some(limiter) = state.limits.auth.clone() {
        let limit = RateLimitState::new(limiter, state.limits.trusted_proxies.clone());
        router = router.layer(middleware::from_fn_with_state(limit, rate_limit));
    }
    router
}

fn users_router() -> Router<AppState> {
    Router::new()
        .route(
            "/me",
            get(users::me).patch(users::update_me).delete(users::delete_me),
        )
        .route("/me/password", put(users::change_password))
        .route("/search", get(users::search))
}

fn workspaces_router() -> Router<AppState> {
    Router::new()
        .route("/", get(workspaces::list).post(workspaces::create))
        .route(
            "/:id",
            get(workspaces::get)
                .patch(workspaces::update)
                .delete(workspaces::delete),
        )
        .route("/:id/members", get(members::list).post(members::invite))
        .route(
            "/:id/members/:user_id",
            axum::routing::patch(members::change_role).delete(members::remove),
        )
        .route("/:id/leave", post(members::leave))
        .route("/:id/transfer", post(members::transfer_ownership))
        .route(
            "/:id/categories",
            get(categories::list).post(categories::create),
        )
        .route("/:id/activity", get(activity::workspace))
}

fn invitations_router() -> Router<AppState> {
    Router::new()
        .route("/", get(invitations::list))
        .route("/:workspace_id/accept", post(invitations::accept))
        .route("/:workspace_id/decline", post(invitations::decline))
}

fn categories_router() -> Router<AppState> {
    Router::new().route(
        "/:id",
        axum::routing::patch(categories::update).delete(categories::delete),
    )
}

fn tasks_router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks::list).post(tasks::create))
        .route(
            "/:id",
            get(tasks::get).patch(tasks::update).delete(tasks::delete),
        )
        .route("/:id/assignee", put(tasks::assign))
        .route("/:id/status", put(tasks::change_status))
        .route("/:id/subtasks", get(subtasks::list).post(subtasks::create))
        .route("/:id/comments", get(comments::list).post(comments::create))
        .route(
            "/:id/attachments",
            get(attachments::list).post(attachments::upload),
        )
        .route("/:id/activity", get(activity::task))
}

fn subtasks_router() -> Router<AppState> {
    Router::new()
        .route(
            "/:id",
            axum::routing::patch(subtasks::update).delete(subtasks::delete),
        )
        .route("/:id/toggle", post(subtasks::toggle))
}

fn comments_router() -> Router<AppState> {
    Router::new().route(
        "/:id",
        axum::routing::patch(comments::update).delete(comments::delete),
    )
}

fn attachments_router() -> Router<AppState> {
    Router::new()
        .route("/:id", axum::routing::delete(attachments::delete))
        .route("/:id/download", get(attachments::download))
}

fn notifications_router() -> Router<AppState> {
    Router::new()
        .route("/", get(notifications::list))
        .route("/unread_count", get(notifications::unread_count))
        .route("/read_all", post(notifications::mark_all_read))
        .route("/:id", axum::routing::delete(notifications::delete))
        .route("/:id/read", post(notifications::mark_read))
}

async fn api_root() -> Json<ApiRoot> {
    Json(ApiRoot {
        type_name: "Root",
        instance_name: "Taskboard",
        core_version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRoot {
    #[serde(rename = "_type")]
    type_name: &'static str,
    instance_name: &'static str,
    core_version: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use mockall::predicate::eq;
    use tb_attachments::{AllowedFileTypes, MemoryStorage};
    use tb_auth::{JwtService, MemorySessionStore, OAuthService, REFRESH_COOKIE};
    use tb_core::config::AppConfig;
    use tb_db::{
        MockActivityStore, MockAttachmentStore, MockCategoryStore, MockCommentStore,
        MockMemberStore, MockNotificationStore, MockSubTaskStore, MockTaskStore, MockUserStore,
        MockWorkspaceStore,
    };
    use tb_models::{User, WorkspaceRole};
    use tb_notifications::{EmailAddress, EmailRenderer, LogEmailSender, NotificationService};
    use tb_services::{Services, Stores};
    use tower::ServiceExt;

    const SECRET: &[u8] = b"test-secret";

    fn account(id: i64, token_version: i32) -> User {
        User {
            id,
            name: format!("User {id}"),
            email: format!("user{id}@example.com"),
            password_hash: None,
            avatar_url: None,
            oauth_provider: None,
            oauth_subject: None,
            token_version,
            email_notifications: true,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn jwt() -> Arc<JwtService> {
        Arc::new(JwtService::new(SECRET, 900, 3600))
    }

    fn app_with(users: MockUserStore, members: MockMemberStore, config: AppConfig) -> Router {
        let users: Arc<dyn tb_db::UserStore> = Arc::new(users);
        let stores = Stores {
            users: users.clone(),
            workspaces: Arc::new(MockWorkspaceStore::new()),
            members: Arc::new(members),
            tasks: Arc::new(MockTaskStore::new()),
            subtasks: Arc::new(MockSubTaskStore::new()),
            comments: Arc::new(MockCommentStore::new()),
            categories: Arc::new(MockCategoryStore::new()),
            attachments: Arc::new(MockAttachmentStore::new()),
            notifications: Arc::new(MockNotificationStore::new()),
            activities: Arc::new(MockActivityStore::new()),
        };
        let notifications = Arc::new(NotificationService::new(
            stores.notifications.clone(),
            users,
            Arc::new(LogEmailSender),
            EmailRenderer::new("http://localhost:3000", EmailAddress::new("no-reply@test")),
        ));
        let oauth = OAuthService::from_config(&config.auth.oauth, &config.server.public_url)
            .expect("oauth without providers");
        let services = Services::build(
            &stores,
            jwt(),
            Arc::new(oauth),
            Arc::new(MemoryStorage::new()),
            AllowedFileTypes::default(),
            notifications,
        );
        let state = AppState::new(
            config,
            stores,
            services,
            Arc::new(MemorySessionStore::new()),
        );
        router(state)
    }

    fn app(users: MockUserStore, members: MockMemberStore) -> Router {
        let mut config = AppConfig::default();
        config.rate_limit.enabled = false;
        app_with(users, members, config)
    }

    fn bearer(user_id: i64, version: i32) -> String {
        let pair = jwt()
            .issue_pair(user_id, &format!("user{user_id}@example.com"), version)
            .unwrap();
        format!("Bearer {}", pair.access_token)
    }

    fn known_user(id: i64, version: i32) -> (MockUserStore, MockMemberStore) {
        let mut users = MockUserStore::new();
        users
            .expect_find_by_id()
            .with(eq(id))
            .returning(move |id| Ok(Some(account(id, version))));
        let mut members = MockMemberStore::new();
        members
            .expect_active_roles_for_user()
            .with(eq(id))
            .returning(|_| Ok(vec![(10, WorkspaceRole::Owner)]));
        (users, members)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn login_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"email":"nobody@example.com","password":"wrong-password"}"#,
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn test_api_root() {
        let response = app(MockUserStore::new(), MockMemberStore::new())
            .oneshot(Request::builder().uri("/api/v1").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["_type"], "Root");
    }

    #[tokio::test]
    async fn test_requires_bearer_token() {
        let response = app(MockUserStore::new(), MockMemberStore::new())
            .oneshot(Request::builder().uri("/api/v1/tasks").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(
            body["errorIdentifier"],
            "urn:taskboard:api:errors:Unauthenticated"
        );
    }

    #[tokio::test]
    async fn test_current_user() {
        let (users, members) = known_user(7, 2);
        let response = app(users, members)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/users/me")
                    .header(header::AUTHORIZATION, bearer(7, 2))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["_type"], "User");
        assert_eq!(body["id"], 7);
        assert_eq!(body["email"], "user7@example.com");
        assert!(body.get("passwordHash").is_none());
        assert!(body.get("tokenVersion").is_none());
    }

    #[tokio::test]
    async fn test_stale_token_version_rejected() {
        let mut users = MockUserStore::new();
        users
            .expect_find_by_id()
            .returning(|id| Ok(Some(account(id, 3))));

        let response = app(users, MockMemberStore::new())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/users/me")
                    .header(header::AUTHORIZATION, bearer(7, 2))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let pair = jwt().issue_pair(7, "user7@example.com", 0).unwrap();

        let response = app(MockUserStore::new(), MockMemberStore::new())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/users/me")
                    .header(
                        header::AUTHORIZATION,
                        format!("Bearer {}", pair.refresh_token),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_from_cookie_rotates_cookie() {
        let pair = jwt().issue_pair(7, "user7@example.com", 1).unwrap();
        let mut users = MockUserStore::new();
        users
            .expect_find_by_id()
            .with(eq(7))
            .returning(|id| Ok(Some(account(id, 1))));

        let response = app(users, MockMemberStore::new())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auth/refresh")
                    .header(
                        header::COOKIE,
                        format!("theme=dark; {REFRESH_COOKIE}={}", pair.refresh_token),
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with(&format!("{REFRESH_COOKIE}=")));
        assert!(set_cookie.contains("HttpOnly"));
        let body = body_json(response).await;
        assert_eq!(body["_type"], "AuthSession");
        assert_eq!(body["user"]["id"], 7);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let response = app(MockUserStore::new(), MockMemberStore::new())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(
            body["errorIdentifier"],
            "urn:taskboard:api:errors:InvalidRequestBody"
        );
    }

    #[tokio::test]
    async fn test_invalid_task_filter() {
        let (users, members) = known_user(7, 0);
        let response = app(users, members)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/tasks?status=someday")
                    .header(header::AUTHORIZATION, bearer(7, 0))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["details"].get("status").is_some());
    }

    #[tokio::test]
    async fn test_refresh_without_token() {
        let response = app(MockUserStore::new(), MockMemberStore::new())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/auth/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_oauth_provider() {
        let response = app(MockUserStore::new(), MockMemberStore::new())
            .oneshot(
                Request::builder()
                    .uri("/api/v1/auth/oauth/myspace")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_auth_rate_limit() {
        let mut users = MockUserStore::new();
        users.expect_find_by_email().returning(|_| Ok(None));

        let mut config = AppConfig::default();
        config.rate_limit.auth_max_requests = 1;
        let app = app_with(users, MockMemberStore::new(), config);

        let first = app.clone().oneshot(login_request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

        let second = app.oneshot(login_request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(header::RETRY_AFTER));
    }
}
