//! Shared fixtures for handler and service tests.

use std::sync::Arc;

use axum_test::TestServer;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::auth::Claims;
use crate::config::AppConfig;
use crate::db::{create_pool, run_migrations, DbConfig, SqliteDeviceRepository};
use crate::devices::DevicesService;
use crate::routes::build_router;
use crate::AppState;

pub const TEST_SECRET: &str = "test-secret-key-for-testing-only";

pub fn create_test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        database_max_connections: 1,
        jwt_secret: TEST_SECRET.to_string(),
        request_timeout_secs: 5,
    }
}

/// Application state backed by a fresh in-memory database
pub async fn create_test_state() -> AppState {
    let config = create_test_config();
    let pool = create_pool(&DbConfig {
        url: config.database_url.clone(),
        max_connections: config.database_max_connections,
    })
    .await
    .expect("Failed to create pool");
    run_migrations(&pool).await.expect("Failed to run migrations");

    AppState {
        devices_service: Arc::new(DevicesService::new(Arc::new(
            SqliteDeviceRepository::new(pool),
        ))),
        config: Arc::new(config),
    }
}

/// The full router, including authentication, behind a test server
pub async fn test_server() -> TestServer {
    let state = create_test_state().await;
    let app = build_router(state.clone()).with_state(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Sign a token for `subject` that expires after `ttl`
pub fn issue_token(subject: &str, secret: &str, ttl: Duration) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: subject.to_string(),
        exp: (now + ttl).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// A valid bearer token for `user`
pub fn token_for(user: &str) -> String {
    issue_token(user, TEST_SECRET, Duration::hours(1))
}
