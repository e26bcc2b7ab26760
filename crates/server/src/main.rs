//! Cartline server binary.
//!
//! Serves the cart, checkout and order JSON API (default port 9000).
//!
//! # Architecture
//!
//! - Axum web framework, JSON in and out
//! - `PostgreSQL` storage through sqlx, or in-memory storage for local runs
//! - tower-sessions for signed-in users, `X-Session-ID` for anonymous carts
//! - A background task that deletes expired carts
//!
//! Migrations are NOT run on startup; use `cartline-cli migrate`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::process::ExitCode;

use cartline_server::config::{LogFormat, ServerConfig, StorageBackend};
use cartline_server::db::{self, Repositories};
use cartline_server::middleware::postgres_store;
use cartline_server::routes;
use cartline_server::services::spawn_cart_reaper;
use cartline_server::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tower_sessions::{MemoryStore, SessionStore};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Failures that stop the server before or while serving.
#[derive(Debug, Error)]
enum StartupError {
    #[error("database URL is required for postgres storage")]
    MissingDatabaseUrl,
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the global subscriber: `RUST_LOG` filter, pretty or JSON output,
/// and the Sentry layer.
fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartline_server=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with((format == LogFormat::Pretty).then(|| tracing_subscriber::fmt::layer()))
        .with((format == LogFormat::Json).then(|| tracing_subscriber::fmt::layer().json()))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration from environment (needed for Sentry init)
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            init_tracing(LogFormat::Pretty);
            error!(error = %err, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);
    if config.sentry_dsn.is_some() {
        info!("Sentry initialized");
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Server stopped with an error");
            ExitCode::FAILURE
        }
    }
}

/// Open storage for the configured backend and serve until shutdown.
async fn run(config: ServerConfig) -> Result<(), StartupError> {
    match config.storage {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_ref()
                .ok_or(StartupError::MissingDatabaseUrl)?;
            let pool = db::create_pool(url).await?;
            info!("Database pool created");

            let store = postgres_store(&pool);
            serve(config, Repositories::postgres(pool), store).await
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; all data is lost on restart");
            serve(config, Repositories::memory(), MemoryStore::default()).await
        }
    }
}

async fn serve<Store>(
    config: ServerConfig,
    repos: Repositories,
    store: Store,
) -> Result<(), StartupError>
where
    Store: SessionStore + Clone,
{
    let addr = config.socket_addr();
    let reap_interval = config.cart_reap_interval;

    let state = AppState::new(config, repos.clone());
    let reaper = reap_interval.map(|period| spawn_cart_reaper(state.carts().clone(), period));
    let app = routes::app(state, store);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "cartline-server listening");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    if let Some(handle) = reaper {
        handle.abort();
    }
    repos.close().await;
    info!("Shutdown complete");

    Ok(served?)
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
