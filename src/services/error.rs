use thiserror::Error;

use crate::application::error::ApplicationError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Token response was not valid JSON: {0}")]
    TokenParse(String),

    #[error("Authentication failed with status {status}")]
    AuthFailed { status: u16, detail: String },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{message}")]
    Upload {
        status: u16,
        message: String,
        detail: serde_json::Value,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StorageError> for ApplicationError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::TokenParse(msg) => ApplicationError::TokenParse(msg),
            StorageError::AuthFailed { status, detail } => {
                ApplicationError::AuthFailed { status, detail }
            }
            StorageError::Timeout(msg) => ApplicationError::Timeout(msg),
            StorageError::Network(msg) => {
                ApplicationError::InternalError(format!("Network error: {}", msg))
            }
            StorageError::Upload {
                status,
                message,
                detail,
            } => ApplicationError::UploadFailed {
                status,
                message,
                detail,
            },
            StorageError::Internal(msg) => ApplicationError::InternalError(msg),
        }
    }
}

impl From<reqwest::Error> for StorageError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            StorageError::Timeout(error.to_string())
        } else if error.is_connect() {
            StorageError::Network(format!("Connection failed: {}", error))
        } else {
            StorageError::Network(error.to_string())
        }
    }
}
