use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::devices::{Device, DeviceId, DevicePayload, Platform};
use crate::error::ErrorResponse;

/// OpenAPI documentation for the push device registration API
///
/// Schema documentation only; the device endpoints are listed in the
/// tag descriptions.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pushreg API",
        version = "1.0.0",
        description = "Register APNS and GCM push notification devices. Open endpoints live under /api/v1/device/{apns,gcm}; endpoints scoped to the authenticated user live under /api/v1/user/device/{apns,gcm}.",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    tags(
        (name = "apns", description = "Apple Push Notification Service devices, keyed by 64-character hex token"),
        (name = "gcm", description = "Google Cloud Messaging devices, keyed by registration token"),
        (name = "user", description = "Device endpoints restricted to the authenticated owner")
    ),
    components(
        schemas(
            ErrorResponse,
            Device,
            DeviceId,
            DevicePayload,
            Platform,
        )
    )
)]
pub struct ApiDoc;

/// Create the Swagger UI router
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
