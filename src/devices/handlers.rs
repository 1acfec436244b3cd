use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};

use crate::extractors::Requester;
use crate::AppState;

use super::models::{Device, DevicePayload, Platform};
use super::serializer::WriteMode;
use super::service::{Access, DevicesError};

fn body(payload: Result<Json<DevicePayload>, JsonRejection>) -> Result<DevicePayload, DevicesError> {
    payload
        .map(|Json(payload)| payload)
        .map_err(|rejection| DevicesError::InvalidBody(rejection.body_text()))
}

/// GET /device/{platform} - List registered devices
pub async fn list_devices(
    State(state): State<AppState>,
    Extension(platform): Extension<Platform>,
    Extension(access): Extension<Access>,
    requester: Requester,
) -> Result<Json<Vec<Device>>, DevicesError> {
    let scope = access.scope(&requester)?;
    let devices = state.devices_service.list(platform, &scope).await?;
    Ok(Json(devices))
}

/// POST /device/{platform} - Register a device
pub async fn create_device(
    State(state): State<AppState>,
    Extension(platform): Extension<Platform>,
    Extension(access): Extension<Access>,
    requester: Requester,
    payload: Result<Json<DevicePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Device>), DevicesError> {
    // Authorized endpoints refuse anonymous registration
    access.scope(&requester)?;
    let payload = body(payload)?;

    let device = state
        .devices_service
        .create(platform, &payload, &requester)
        .await?;

    Ok((StatusCode::CREATED, Json(device)))
}

/// GET /device/{platform}/{registration_id} - Fetch a device
pub async fn get_device(
    State(state): State<AppState>,
    Extension(platform): Extension<Platform>,
    Extension(access): Extension<Access>,
    requester: Requester,
    Path(registration_id): Path<String>,
) -> Result<Json<Device>, DevicesError> {
    let scope = access.scope(&requester)?;
    let device = state
        .devices_service
        .retrieve(platform, &registration_id, &scope)
        .await?;
    Ok(Json(device))
}

/// PUT /device/{platform}/{registration_id} - Replace a device's fields
pub async fn update_device(
    State(state): State<AppState>,
    Extension(platform): Extension<Platform>,
    Extension(access): Extension<Access>,
    requester: Requester,
    Path(registration_id): Path<String>,
    payload: Result<Json<DevicePayload>, JsonRejection>,
) -> Result<Json<Device>, DevicesError> {
    write_device(
        &state,
        platform,
        access,
        &requester,
        &registration_id,
        payload,
        WriteMode::Replace,
    )
    .await
}

/// PATCH /device/{platform}/{registration_id} - Update selected fields
pub async fn partial_update_device(
    State(state): State<AppState>,
    Extension(platform): Extension<Platform>,
    Extension(access): Extension<Access>,
    requester: Requester,
    Path(registration_id): Path<String>,
    payload: Result<Json<DevicePayload>, JsonRejection>,
) -> Result<Json<Device>, DevicesError> {
    write_device(
        &state,
        platform,
        access,
        &requester,
        &registration_id,
        payload,
        WriteMode::Partial,
    )
    .await
}

async fn write_device(
    state: &AppState,
    platform: Platform,
    access: Access,
    requester: &Requester,
    registration_id: &str,
    payload: Result<Json<DevicePayload>, JsonRejection>,
    mode: WriteMode,
) -> Result<Json<Device>, DevicesError> {
    let scope = access.scope(requester)?;
    let payload = body(payload)?;

    let device = state
        .devices_service
        .update(platform, registration_id, &payload, mode, &scope)
        .await?;

    Ok(Json(device))
}

/// DELETE /device/{platform}/{registration_id} - Unregister a device
pub async fn delete_device(
    State(state): State<AppState>,
    Extension(platform): Extension<Platform>,
    Extension(access): Extension<Access>,
    requester: Requester,
    Path(registration_id): Path<String>,
) -> Result<StatusCode, DevicesError> {
    let scope = access.scope(&requester)?;
    state
        .devices_service
        .destroy(platform, &registration_id, &scope)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
