use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::devices::validation::FieldErrors;

/// Standard error response format for all API errors
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Validation messages keyed by field name
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub fields: Option<FieldErrors>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            fields: None,
        }
    }

    pub fn with_code(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
            fields: None,
        }
    }

    pub fn with_fields(mut self, fields: FieldErrors) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// Trait for errors that can be converted to HTTP responses
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Optional error code for programmatic handling (e.g., "DEVICE_NOT_FOUND")
    fn error_code(&self) -> Option<&'static str> {
        None
    }

    /// Per-field validation messages, if any
    fn field_errors(&self) -> Option<&FieldErrors> {
        None
    }
}

/// Convert any HttpError into an Axum response
///
/// Server errors are logged with their full detail but only the status
/// reason is returned to the client.
pub fn into_response<E: HttpError>(err: E) -> Response {
    let status = err.status_code();
    let code = err.error_code();
    let detail = err.to_string();

    let message = if status.is_server_error() {
        tracing::error!(error = %detail, status = %status, code = ?code, "API error");
        status
            .canonical_reason()
            .unwrap_or("Internal Server Error")
            .to_string()
    } else {
        tracing::debug!(error = %detail, status = %status, code = ?code, "API error");
        detail
    };

    let mut body = match code {
        Some(code) => ErrorResponse::with_code(message, code),
        None => ErrorResponse::new(message),
    };
    if let Some(fields) = err.field_errors() {
        body = body.with_fields(fields.clone());
    }

    (status, Json(body)).into_response()
}

/// Macro to implement IntoResponse for HttpError types
#[macro_export]
macro_rules! impl_into_response {
    ($error_type:ty) => {
        impl axum::response::IntoResponse for $error_type {
            fn into_response(self) -> axum::response::Response {
                $crate::error::into_response(self)
            }
        }
    };
}
