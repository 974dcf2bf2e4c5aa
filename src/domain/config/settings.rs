use thiserror::Error;

pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing required environment variables: {0}")]
    MissingVars(String),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Connection settings for the Microsoft Graph drive the proxy uploads to.
///
/// All five identifiers are required. `drive_name` is only set when the
/// configured drive id must be double-checked against the drives listed for
/// the site (see `GraphStorageService::resolve_drive_id`).
#[derive(Debug, Clone)]
pub struct GraphSettings {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub site_id: String,
    pub drive_id: String,
    pub drive_name: Option<String>,
    pub timeout_secs: u64,
}

impl GraphSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::resolve(|name| std::env::var(name).ok())
    }

    /// Collects the settings through `lookup`, reporting every missing
    /// required name at once instead of failing on the first one.
    pub fn resolve<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut required = |name: &'static str| match lookup(name) {
            Some(value) if !value.trim().is_empty() => Some(value),
            _ => {
                missing.push(name);
                None
            }
        };

        let client_id = required("GRAPH_CLIENT_ID");
        let client_secret = required("GRAPH_CLIENT_SECRET");
        let tenant_id = required("GRAPH_TENANT_ID");
        let site_id = required("GRAPH_SITE_ID");
        let drive_id = required("GRAPH_DRIVE_ID");

        let timeout_secs = match lookup("UPLOAD_TIMEOUT_SECS") {
            Some(value) => value.parse::<u64>().map_err(|_| SettingsError::InvalidValue {
                name: "UPLOAD_TIMEOUT_SECS",
                value,
            })?,
            None => DEFAULT_UPLOAD_TIMEOUT_SECS,
        };

        match (client_id, client_secret, tenant_id, site_id, drive_id) {
            (Some(client_id), Some(client_secret), Some(tenant_id), Some(site_id), Some(drive_id)) => {
                Ok(Self {
                    client_id,
                    client_secret,
                    tenant_id,
                    site_id,
                    drive_id,
                    drive_name: lookup("GRAPH_DRIVE_NAME").filter(|v| !v.trim().is_empty()),
                    timeout_secs,
                })
            }
            _ => Err(SettingsError::MissingVars(missing.join(", "))),
        }
    }
}
