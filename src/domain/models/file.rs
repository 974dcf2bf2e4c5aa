use serde::Serialize;

#[derive(Debug, Clone)]
pub struct FileData {
    pub content: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl FileData {
    pub fn new(content: Vec<u8>, filename: String, mime_type: String) -> Self {
        Self {
            content,
            filename,
            mime_type,
        }
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// What the remote drive reported back for a completed upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub file_name: String,
    pub remote: serde_json::Value,
}
