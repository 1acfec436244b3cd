use std::sync::Arc;

use axum::http::StatusCode;
use thiserror::Error;

use crate::db::{DbError, DeviceRepository};
use crate::error::HttpError;
use crate::extractors::Requester;
use crate::impl_into_response;

use super::models::{Device, DevicePayload, OwnerScope, Platform};
use super::serializer::{validate_payload, WriteMode};
use super::validation::{FieldErrors, NOT_UNIQUE};

#[derive(Error, Debug)]
pub enum DevicesError {
    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Device not found")]
    NotFound,

    #[error("Authentication credentials were not provided")]
    NotAuthenticated,

    #[error("You do not have permission to perform this action")]
    PermissionDenied,

    #[error("Storage failure: {0}")]
    Database(DbError),
}

impl From<DbError> for DevicesError {
    fn from(err: DbError) -> Self {
        // A racing writer can slip past the pre-write check
        if err.is_unique_violation() {
            Self::Validation(FieldErrors::single("registration_id", NOT_UNIQUE))
        } else {
            Self::Database(err)
        }
    }
}

impl HttpError for DevicesError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Validation(_) => Some("VALIDATION_ERROR"),
            Self::InvalidBody(_) => Some("INVALID_BODY"),
            Self::NotFound => Some("DEVICE_NOT_FOUND"),
            Self::NotAuthenticated => Some("NOT_AUTHENTICATED"),
            Self::PermissionDenied => Some("PERMISSION_DENIED"),
            Self::Database(_) => Some("DATABASE_ERROR"),
        }
    }

    fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl_into_response!(DevicesError);

/// How an endpoint family treats ownership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone may read and write every record
    Open,
    /// Authentication required; only the caller's own records are visible
    Authorized,
}

impl Access {
    /// Resolve the record scope for a requester
    pub fn scope(self, requester: &Requester) -> Result<OwnerScope, DevicesError> {
        match (self, requester.user_id()) {
            (Access::Open, _) => Ok(OwnerScope::All),
            (Access::Authorized, Some(user)) => Ok(OwnerScope::Owner(user.to_string())),
            (Access::Authorized, None) => Err(DevicesError::NotAuthenticated),
        }
    }
}

/// Service for managing device registrations
pub struct DevicesService {
    repo: Arc<dyn DeviceRepository>,
}

impl DevicesService {
    pub fn new(repo: Arc<dyn DeviceRepository>) -> Self {
        Self { repo }
    }

    /// List devices visible in the scope
    pub async fn list(
        &self,
        platform: Platform,
        scope: &OwnerScope,
    ) -> Result<Vec<Device>, DevicesError> {
        Ok(self.repo.list(platform, scope).await?)
    }

    /// Fetch one device and apply the object-level permission check
    pub async fn retrieve(
        &self,
        platform: Platform,
        registration_id: &str,
        scope: &OwnerScope,
    ) -> Result<Device, DevicesError> {
        let device = self
            .repo
            .get(platform, registration_id, scope)
            .await?
            .ok_or(DevicesError::NotFound)?;

        if !scope.permits(&device) {
            return Err(DevicesError::PermissionDenied);
        }

        Ok(device)
    }

    /// Register a new device. The owner is always the requester, never the body.
    pub async fn create(
        &self,
        platform: Platform,
        payload: &DevicePayload,
        requester: &Requester,
    ) -> Result<Device, DevicesError> {
        let changes = validate_payload(platform, payload, WriteMode::Create)
            .map_err(DevicesError::Validation)?;

        if let Some(registration_id) = &changes.registration_id {
            self.ensure_unique(platform, registration_id, None).await?;
        }

        let owner = requester.user_id().map(str::to_string);
        let device = self
            .repo
            .insert(&changes.into_new_device(platform, owner))
            .await?;

        tracing::info!(
            platform = platform.as_str(),
            owner = ?device.owner,
            "Device registered"
        );

        Ok(device)
    }

    /// Apply a full (PUT) or partial (PATCH) update
    pub async fn update(
        &self,
        platform: Platform,
        registration_id: &str,
        payload: &DevicePayload,
        mode: WriteMode,
        scope: &OwnerScope,
    ) -> Result<Device, DevicesError> {
        let mut device = self.retrieve(platform, registration_id, scope).await?;

        let changes = validate_payload(platform, payload, mode).map_err(DevicesError::Validation)?;

        if let Some(new_id) = &changes.registration_id {
            self.ensure_unique(platform, new_id, Some(device.id)).await?;
        }

        changes.apply(&mut device);

        if !self.repo.update(&device, scope).await? {
            return Err(DevicesError::NotFound);
        }

        tracing::info!(
            platform = platform.as_str(),
            owner = ?device.owner,
            "Device updated"
        );

        Ok(device)
    }

    /// Delete a device
    pub async fn destroy(
        &self,
        platform: Platform,
        registration_id: &str,
        scope: &OwnerScope,
    ) -> Result<(), DevicesError> {
        let device = self.retrieve(platform, registration_id, scope).await?;

        if !self.repo.remove(platform, registration_id, scope).await? {
            return Err(DevicesError::NotFound);
        }

        tracing::info!(
            platform = platform.as_str(),
            owner = ?device.owner,
            "Device unregistered"
        );

        Ok(())
    }

    async fn ensure_unique(
        &self,
        platform: Platform,
        registration_id: &str,
        exclude_id: Option<i64>,
    ) -> Result<(), DevicesError> {
        if self
            .repo
            .registration_id_exists(platform, registration_id, exclude_id)
            .await?
        {
            return Err(DevicesError::Validation(FieldErrors::single(
                "registration_id",
                NOT_UNIQUE,
            )));
        }
        Ok(())
    }
}
