mod auth;
mod config;
mod db;
mod devices;
mod error;
mod extractors;
mod health;
mod middleware;
mod openapi;
mod routes;
#[cfg(test)]
mod test_utils;

use axum::{error_handling::HandleErrorLayer, http::StatusCode, BoxError, Json};
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::db::{DbConfig, SqliteDeviceRepository};
use crate::devices::DevicesService;
use crate::error::ErrorResponse;

#[derive(Clone)]
pub struct AppState {
    pub devices_service: Arc<DevicesService>,
    pub config: Arc<AppConfig>,
}

/// Handle request timeout errors
async fn handle_timeout_error(err: BoxError) -> (StatusCode, Json<ErrorResponse>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(ErrorResponse::with_code("Request timed out", "REQUEST_TIMEOUT")),
        )
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::with_code("Internal Server Error", "INTERNAL_ERROR")),
        )
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl+c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pushreg=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;
    tracing::info!("Configuration loaded successfully");

    // Open the database and bring the schema up to date
    let pool = db::create_pool(&DbConfig {
        url: config.database_url.clone(),
        max_connections: config.database_max_connections,
    })
    .await?;
    db::run_migrations(&pool).await?;
    tracing::info!(url = %config.database_url, "Database ready");

    let devices_service = Arc::new(DevicesService::new(Arc::new(
        SqliteDeviceRepository::new(pool),
    )));

    // Create shared application state
    let state = AppState {
        devices_service,
        config: Arc::new(config.clone()),
    };

    let app = routes::build_router(state.clone())
        .layer(
            ServiceBuilder::new()
                // Handle timeout errors
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .timeout(Duration::from_secs(config.request_timeout_secs)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server with graceful shutdown
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
