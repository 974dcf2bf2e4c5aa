#[derive(Debug)]
pub enum ApplicationError {
    Configuration(String),
    BadRequest(String),
    FileDecode(String),
    TokenParse(String),
    AuthFailed {
        status: u16,
        detail: String,
    },
    UploadFailed {
        status: u16,
        message: String,
        detail: serde_json::Value,
    },
    Timeout(String),
    MethodNotAllowed(String),
    InternalError(String),
}
