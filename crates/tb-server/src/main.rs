//! Taskboard server
//!
//! Loads configuration, connects to PostgreSQL, wires the stores and
//! services, serves the JSON API with health and metrics endpoints and runs
//! the background jobs until a shutdown signal arrives.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::{middleware, routing::get, Router};
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tb_api::AppState;
use tb_attachments::{AllowedFileTypes, LocalStorage};
use tb_auth::{JwtService, MemorySessionStore, OAuthService, SessionStore};
use tb_core::config::{AppConfig, ServerConfig};
use tb_db::Database;
use tb_notifications::{
    sender_from_config, DueDateReminder, EmailRenderer, NotificationService, ReminderScheduler,
};
use tb_services::{Services, Stores};

mod health;
mod metrics;

use health::{HealthChecker, HealthConfig};
use metrics::Metrics;

/// How often expired sessions and idle rate-limit windows are dropped
const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::load().context("loading configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        host = %config.server.host,
        port = config.server.port,
        "Starting Taskboard"
    );
    if config.uses_default_secret() {
        warn!("JWT_SECRET is not set; tokens are signed with the built-in development secret");
    }

    let db = Database::connect(&config.database)
        .await
        .context("connecting to the database")?;
    info!("Connected to database");
    if config.database.run_migrations {
        db.migrate().await.context("running migrations")?;
    }

    let stores = Stores::postgres(&db);
    let jwt = Arc::new(JwtService::from_config(&config.auth));
    let oauth = Arc::new(
        OAuthService::from_config(&config.auth.oauth, &config.server.public_url)
            .context("configuring OAuth providers")?,
    );
    let storage = Arc::new(LocalStorage::new(&config.storage.local_path));
    let file_types = AllowedFileTypes::with_max_file_size(config.storage.max_attachment_size as u64);

    let sender = sender_from_config(&config.email).context("configuring email delivery")?;
    info!(delivery = sender.name(), "Email delivery configured");
    let notifications = Arc::new(NotificationService::new(
        stores.notifications.clone(),
        stores.users.clone(),
        sender,
        EmailRenderer::from_config(&config.email, &config.server.frontend_url),
    ));

    let services = Services::build(
        &stores,
        jwt,
        oauth,
        storage,
        file_types,
        notifications.clone(),
    );
    let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let state = AppState::new(config.clone(), stores.clone(), services, sessions);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(housekeeping(state.clone(), shutdown_rx.clone()));

    if config.reminders.enabled {
        let reminder = Arc::new(DueDateReminder::new(
            stores.tasks.clone(),
            notifications,
            config.reminders.lookahead_hours,
        ));
        let scheduler = ReminderScheduler::new(reminder, config.reminders.hour_utc);
        tokio::spawn(scheduler.run(shutdown_rx.clone()));
    }

    let health = Arc::new(
        HealthChecker::new(HealthConfig::default())
            .with_database(db.clone())
            .with_storage_path(&config.storage.local_path),
    );
    let metrics = Arc::new(Metrics::new());
    let app = build_router(tb_api::router(state), health, metrics, &config.server);

    let addr = config.server_addr()?;
    info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = shutdown_tx.send(true);
    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// `LOG_FORMAT=json` switches to one JSON object per line
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tb_server=debug,tb_api=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

fn build_router(
    api: Router,
    health: Arc<HealthChecker>,
    metrics: Arc<Metrics>,
    server: &ServerConfig,
) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::liveness))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/health/full", get(health::readiness))
        .with_state(health);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::prometheus_metrics))
        .route("/metrics.json", get(metrics::json_metrics))
        .with_state(metrics.clone());

    Router::new()
        .merge(health_routes)
        .merge(metrics_routes)
        .merge(api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors_layer(server)),
        )
        .layer(middleware::from_fn_with_state(
            metrics,
            metrics::metrics_middleware,
        ))
}

/// Credentialed CORS for the frontend, or for `cors_origins` when set
fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let configured = if server.cors_origins.is_empty() {
        std::slice::from_ref(&server.frontend_url)
    } else {
        server.cors_origins.as_slice()
    };
    let origins: Vec<HeaderValue> = configured
        .iter()
        .filter_map(|origin| {
            let origin = origin.trim_end_matches('/');
            HeaderValue::from_str(origin)
                .map_err(|_| warn!(origin, "Ignoring invalid CORS origin"))
                .ok()
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([
            header::RETRY_AFTER,
            header::CONTENT_DISPOSITION,
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("x-ratelimit-remaining"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Drops expired sessions and idle rate-limit windows until shutdown
async fn housekeeping(state: AppState, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(HOUSEKEEPING_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let sessions = state.sessions.cleanup_expired();
                let now = Instant::now();
                let windows: usize = [state.limits.global.as_ref(), state.limits.auth.as_ref()]
                    .into_iter()
                    .flatten()
                    .map(|limiter| limiter.prune(now))
                    .sum();
                if sessions + windows > 0 {
                    tracing::debug!(sessions, windows, "Housekeeping pruned expired entries");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return;
                }
            }
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
