use async_trait::async_trait;

use crate::{
    application::error::ApplicationError,
    domain::models::file::{FileData, UploadReceipt},
};

/// Seam between the upload handler and the remote document store. The
/// production implementation talks to Microsoft Graph; tests swap in a
/// recording stub.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn upload(&self, file_data: FileData) -> Result<UploadReceipt, ApplicationError>;
}
