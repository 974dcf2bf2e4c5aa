use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::application::error::ApplicationError;

/// Keeps a status reported by the upstream API, but never lets a 1xx/2xx/3xx
/// leak into our own error response.
fn upstream_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApplicationError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApplicationError::Configuration(ref msg) => {
                error!("Server configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Server configuration error", "details": msg }),
                )
            }
            ApplicationError::BadRequest(ref msg) => {
                warn!("Bad request: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "Bad request", "details": msg }),
                )
            }
            ApplicationError::FileDecode(ref msg) => {
                warn!("File decoding failed: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    json!({ "error": "File decoding failed", "details": msg }),
                )
            }
            ApplicationError::TokenParse(ref msg) => {
                error!("Failed to parse token response: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to parse token response", "details": msg }),
                )
            }
            ApplicationError::AuthFailed { status, ref detail } => {
                error!("Authentication failed with upstream status {}", status);
                (
                    upstream_status(status),
                    json!({ "error": "Authentication failed", "details": detail }),
                )
            }
            ApplicationError::UploadFailed {
                status,
                ref message,
                ref detail,
            } => {
                error!("Upload failed with upstream status {}: {}", status, message);
                (
                    upstream_status(status),
                    json!({ "error": message, "details": detail }),
                )
            }
            ApplicationError::Timeout(ref msg) => {
                error!("Upstream request timed out: {}", msg);
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    json!({ "error": "Upstream request timed out", "details": msg }),
                )
            }
            ApplicationError::MethodNotAllowed(ref http_method) => {
                warn!("Method not allowed: {}", http_method);
                (
                    StatusCode::METHOD_NOT_ALLOWED,
                    json!({ "error": "Method not allowed", "method": http_method }),
                )
            }
            ApplicationError::InternalError(ref msg) => {
                error!("Internal server error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error", "details": msg }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
