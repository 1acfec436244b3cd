use axum::{middleware, routing::get, Extension, Router};

use crate::devices::handlers as devices_handlers;
use crate::devices::{Access, Platform};
use crate::health;
use crate::middleware::authenticate;
use crate::openapi::swagger_ui;
use crate::AppState;

/// Build the CRUD routes for one platform under `prefix`
///
/// `/device/{platform}` lists and creates, `/device/{platform}/{registration_id}`
/// reads, replaces, patches and deletes a single registration.
fn device_routes(prefix: &str, platform: Platform, access: Access) -> Router<AppState> {
    let collection = format!("{}/device/{}", prefix, platform.as_str());
    let item = format!("{}/{{registration_id}}", collection);

    Router::new()
        .route(
            &collection,
            get(devices_handlers::list_devices).post(devices_handlers::create_device),
        )
        .route(
            &item,
            get(devices_handlers::get_device)
                .put(devices_handlers::update_device)
                .patch(devices_handlers::partial_update_device)
                .delete(devices_handlers::delete_device),
        )
        .layer(Extension(access))
        .layer(Extension(platform))
}

/// Open endpoints: any caller may manage any registration
fn open_device_routes() -> Router<AppState> {
    Router::new()
        .merge(device_routes("", Platform::Apns, Access::Open))
        .merge(device_routes("", Platform::Gcm, Access::Open))
}

/// Authorized endpoints: authentication required, scoped to the caller's devices
fn authorized_device_routes() -> Router<AppState> {
    Router::new()
        .merge(device_routes("/user", Platform::Apns, Access::Authorized))
        .merge(device_routes("/user", Platform::Gcm, Access::Authorized))
}

/// Build all API v1 routes
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(open_device_routes())
        .merge(authorized_device_routes())
}

/// Build the complete application router
pub fn build_router(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check at root level
        .route("/", get(health::health))
        .route("/health", get(health::health))
        // API v1 routes
        .nest("/api/v1", api_v1_routes())
        // Swagger UI for API documentation
        .merge(swagger_ui())
        .layer(middleware::from_fn_with_state(state, authenticate))
}
