use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    query::Query,
    sqlite::{SqliteArguments, SqliteRow},
    Row, Sqlite, SqlitePool,
};
use uuid::Uuid;

use crate::devices::{Device, DeviceId, NewDevice, OwnerScope, Platform};

use super::DbError;

const DEVICE_COLUMNS: &str =
    "id, name, registration_id, device_id, active, date_created, owner_id";

/// Owner filter appended to every scoped statement; binds the owner twice
const OWNER_PREDICATE: &str = "(? IS NULL OR owner_id = ?)";

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Repository trait for device registrations.
///
/// Every read, update and delete takes an [`OwnerScope`] so the ownership
/// filter cannot be forgotten by callers.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// List devices visible in the scope, newest first
    async fn list(&self, platform: Platform, scope: &OwnerScope) -> Result<Vec<Device>, DbError>;

    /// Get a device by its registration ID
    async fn get(
        &self,
        platform: Platform,
        registration_id: &str,
        scope: &OwnerScope,
    ) -> Result<Option<Device>, DbError>;

    /// Check whether a registration ID is already used by another record
    async fn registration_id_exists(
        &self,
        platform: Platform,
        registration_id: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbError>;

    /// Insert a new device and return the stored record
    async fn insert(&self, device: &NewDevice) -> Result<Device, DbError>;

    /// Write the mutable fields of an existing device
    async fn update(&self, device: &Device, scope: &OwnerScope) -> Result<bool, DbError>;

    /// Remove a device by registration ID
    async fn remove(
        &self,
        platform: Platform,
        registration_id: &str,
        scope: &OwnerScope,
    ) -> Result<bool, DbError>;
}

/// SQLite implementation of DeviceRepository
pub struct SqliteDeviceRepository {
    pool: SqlitePool,
}

impl SqliteDeviceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn bind_device_id(query: SqliteQuery<'_>, device_id: Option<DeviceId>) -> SqliteQuery<'_> {
        match device_id {
            Some(DeviceId::Uuid(uuid)) => query.bind(uuid.to_string()),
            Some(DeviceId::Android(value)) => query.bind(value),
            None => query.bind(None::<i64>),
        }
    }

    fn bind_scope<'q>(query: SqliteQuery<'q>, scope: &'q OwnerScope) -> SqliteQuery<'q> {
        let owner = scope.owner();
        query.bind(owner).bind(owner)
    }

    fn row_to_device(platform: Platform, row: &SqliteRow) -> Result<Device, DbError> {
        let device_id = match platform {
            Platform::Apns => row
                .try_get::<Option<String>, _>("device_id")?
                .map(|raw| {
                    Uuid::parse_str(&raw)
                        .map(DeviceId::Uuid)
                        .map_err(|e| DbError::InvalidRow(format!("device_id {:?}: {}", raw, e)))
                })
                .transpose()?,
            Platform::Gcm => row
                .try_get::<Option<i64>, _>("device_id")?
                .map(DeviceId::Android),
        };

        let created_ms: i64 = row.try_get("date_created")?;
        let date_created = DateTime::from_timestamp_millis(created_ms).ok_or_else(|| {
            DbError::InvalidRow(format!("date_created out of range: {}", created_ms))
        })?;

        Ok(Device {
            id: row.try_get("id")?,
            platform,
            name: row.try_get("name")?,
            registration_id: row.try_get("registration_id")?,
            device_id,
            active: row.try_get::<i32, _>("active")? != 0,
            date_created,
            owner: row.try_get("owner_id")?,
        })
    }
}

#[async_trait]
impl DeviceRepository for SqliteDeviceRepository {
    async fn list(&self, platform: Platform, scope: &OwnerScope) -> Result<Vec<Device>, DbError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY date_created DESC, id DESC",
            DEVICE_COLUMNS,
            platform.table(),
            OWNER_PREDICATE
        );

        let rows = Self::bind_scope(sqlx::query(&sql), scope)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| Self::row_to_device(platform, row))
            .collect()
    }

    async fn get(
        &self,
        platform: Platform,
        registration_id: &str,
        scope: &OwnerScope,
    ) -> Result<Option<Device>, DbError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE registration_id = ? AND {}",
            DEVICE_COLUMNS,
            platform.table(),
            OWNER_PREDICATE
        );

        let row = Self::bind_scope(sqlx::query(&sql).bind(registration_id), scope)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| Self::row_to_device(platform, &row))
            .transpose()
    }

    async fn registration_id_exists(
        &self,
        platform: Platform,
        registration_id: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, DbError> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE registration_id = ? AND (? IS NULL OR id != ?)",
            platform.table()
        );

        let row: (i64,) = sqlx::query_as(&sql)
            .bind(registration_id)
            .bind(exclude_id)
            .bind(exclude_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0 > 0)
    }

    async fn insert(&self, device: &NewDevice) -> Result<Device, DbError> {
        let created_ms = Utc::now().timestamp_millis();
        let sql = format!(
            "INSERT INTO {} (name, registration_id, device_id, active, date_created, owner_id)
             VALUES (?, ?, ?, ?, ?, ?)",
            device.platform.table()
        );

        let query = sqlx::query(&sql)
            .bind(&device.name)
            .bind(&device.registration_id);
        let result = Self::bind_device_id(query, device.device_id)
            .bind(if device.active { 1 } else { 0 })
            .bind(created_ms)
            .bind(&device.owner)
            .execute(&self.pool)
            .await?;

        let date_created = DateTime::from_timestamp_millis(created_ms).ok_or_else(|| {
            DbError::InvalidRow(format!("date_created out of range: {}", created_ms))
        })?;

        Ok(Device {
            id: result.last_insert_rowid(),
            platform: device.platform,
            name: device.name.clone(),
            registration_id: device.registration_id.clone(),
            device_id: device.device_id,
            active: device.active,
            date_created,
            owner: device.owner.clone(),
        })
    }

    async fn update(&self, device: &Device, scope: &OwnerScope) -> Result<bool, DbError> {
        // date_created and owner_id are never rewritten
        let sql = format!(
            "UPDATE {} SET name = ?, registration_id = ?, device_id = ?, active = ?
             WHERE id = ? AND {}",
            device.platform.table(),
            OWNER_PREDICATE
        );

        let query = sqlx::query(&sql)
            .bind(&device.name)
            .bind(&device.registration_id);
        let query = Self::bind_device_id(query, device.device_id)
            .bind(if device.active { 1 } else { 0 })
            .bind(device.id);
        let result = Self::bind_scope(query, scope).execute(&self.pool).await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(
        &self,
        platform: Platform,
        registration_id: &str,
        scope: &OwnerScope,
    ) -> Result<bool, DbError> {
        let sql = format!(
            "DELETE FROM {} WHERE registration_id = ? AND {}",
            platform.table(),
            OWNER_PREDICATE
        );

        let result = Self::bind_scope(sqlx::query(&sql).bind(registration_id), scope)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
