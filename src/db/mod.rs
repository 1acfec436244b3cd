mod device_repo;

pub use device_repo::{DeviceRepository, SqliteDeviceRepository};

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Invalid stored row: {0}")]
    InvalidRow(String),
}

impl DbError {
    /// Whether the failure was a UNIQUE constraint violation
    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::Sqlx(e) => e
                .as_database_error()
                .is_some_and(|db| db.is_unique_violation()),
            _ => false,
        }
    }
}

/// Database configuration
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Create and configure a SQLite connection pool
pub async fn create_pool(config: &DbConfig) -> Result<SqlitePool, DbError> {
    // Ensure the data directory exists
    if let Some(db_path) = config.url.strip_prefix("sqlite:") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    DbError::Migration(format!("Failed to create database directory: {}", e))
                })?;
            }
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&format!("{}?mode=rwc", config.url))
        .await?;

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
    let migration_001 = include_str!("../../migrations/001_create_device_tables.sql");
    sqlx::raw_sql(migration_001).execute(pool).await?;

    tracing::info!("Database migrations completed");
    Ok(())
}
