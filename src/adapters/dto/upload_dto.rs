use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::file::UploadReceipt;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    pub data: serde_json::Value,
}

impl From<UploadReceipt> for UploadResponse {
    fn from(receipt: UploadReceipt) -> Self {
        Self {
            message: "File uploaded successfully".to_string(),
            file_name: receipt.file_name,
            data: receipt.remote,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadInfoResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
