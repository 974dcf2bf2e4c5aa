use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, Method},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use tracing::info;

use crate::{
    adapters::{
        dto::upload_dto::{UploadInfoResponse, UploadQuery, UploadResponse},
        state::AppState,
    },
    application::error::ApplicationError,
    domain::models::file::FileData,
};

const DEFAULT_FILE_NAME: &str = "upload.pdf";
const TRANSFER_ENCODING_HEADER: &str = "content-transfer-encoding";

pub struct UploadController;

impl UploadController {
    /// POST /api/v1/upload?fileName=...
    ///
    /// Body is the raw file bytes, or base64 text when the request carries
    /// `Content-Transfer-Encoding: base64`. The name from the query string is
    /// sanitized before it becomes a drive path segment.
    pub async fn upload_file(
        State(app_state): State<AppState>,
        Query(query): Query<UploadQuery>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Json<UploadResponse>, ApplicationError> {
        let store = app_state.store.clone().ok_or_else(|| {
            ApplicationError::Configuration(
                "Graph upload settings are incomplete; check the server environment".to_string(),
            )
        })?;

        let file_name = sanitize_file_name(query.file_name.as_deref().unwrap_or(DEFAULT_FILE_NAME));
        let content = decode_body(&headers, body)?;

        if content.is_empty() {
            return Err(ApplicationError::BadRequest(
                "Request body is empty".to_string(),
            ));
        }

        info!("Upload requested for '{}' ({} bytes)", file_name, content.len());

        let mime_type = if file_name.ends_with(".pdf") {
            "application/pdf"
        } else {
            "application/octet-stream"
        };

        let file_data = FileData::new(content, file_name, mime_type.to_string());
        let receipt = store.upload(file_data).await?;

        Ok(Json(UploadResponse::from(receipt)))
    }

    /// GET /api/v1/upload - reachability diagnostic
    pub async fn upload_info() -> Json<UploadInfoResponse> {
        Json(UploadInfoResponse {
            message: "Upload endpoint is ready".to_string(),
            timestamp: Utc::now(),
        })
    }

    pub async fn method_not_allowed(http_method: Method) -> ApplicationError {
        ApplicationError::MethodNotAllowed(http_method.to_string())
    }
}

fn decode_body(headers: &HeaderMap, body: Bytes) -> Result<Vec<u8>, ApplicationError> {
    let base64_flagged = headers
        .get(TRANSFER_ENCODING_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("base64"))
        .unwrap_or(false);

    if !base64_flagged {
        return Ok(body.to_vec());
    }

    let text = std::str::from_utf8(&body)
        .map_err(|e| ApplicationError::FileDecode(format!("base64 body is not valid UTF-8: {}", e)))?;

    general_purpose::STANDARD
        .decode(text.trim())
        .map_err(|e| ApplicationError::FileDecode(format!("base64 decoding failed: {}", e)))
}

fn sanitize_file_name(name: &str) -> String {
    let safe = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>();

    if safe.trim_matches('_').is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        safe
    }
}
