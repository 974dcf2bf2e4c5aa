use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    application::{error::ApplicationError, services::DocumentStore},
    domain::{
        config::settings::GraphSettings,
        models::file::{FileData, UploadReceipt},
    },
    services::error::StorageError,
};

const DEFAULT_LOGIN_BASE: &str = "https://login.microsoftonline.com";
const DEFAULT_GRAPH_BASE: &str = "https://graph.microsoft.com";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DriveList {
    value: Vec<DriveEntry>,
}

#[derive(Debug, Deserialize)]
struct DriveEntry {
    id: String,
    name: Option<String>,
}

/// Uploads files into a SharePoint drive through the Microsoft Graph API.
///
/// Every upload is one linear pass: client-credentials token exchange,
/// optional drive resolution, content PUT. Tokens are used once and dropped;
/// nothing is cached or retried across requests.
pub struct GraphStorageService {
    client: Client,
    settings: GraphSettings,
    login_base: String,
    graph_base: String,
}

impl GraphStorageService {
    pub fn new(settings: GraphSettings) -> Result<Self, StorageError> {
        Self::with_endpoints(
            settings,
            DEFAULT_LOGIN_BASE.to_string(),
            DEFAULT_GRAPH_BASE.to_string(),
        )
    }

    /// Constructor with overridable endpoints so tests can point the client
    /// at a local mock server.
    pub fn with_endpoints(
        settings: GraphSettings,
        login_base: String,
        graph_base: String,
    ) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            settings,
            login_base: login_base.trim_end_matches('/').to_string(),
            graph_base: graph_base.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_access_token(&self) -> Result<String, StorageError> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.login_base, self.settings.tenant_id
        );

        let response = self
            .client
            .post(&url)
            .form(&[
                ("client_id", self.settings.client_id.as_str()),
                ("client_secret", self.settings.client_secret.as_str()),
                ("grant_type", "client_credentials"),
                ("scope", GRAPH_SCOPE),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| StorageError::TokenParse(e.to_string()))?;

        match token.access_token {
            Some(access_token) if status.is_success() => Ok(access_token),
            _ => Err(StorageError::AuthFailed {
                status: status.as_u16(),
                detail: body,
            }),
        }
    }

    /// Resolves the drive to upload into. When a drive label is configured,
    /// the drives listed for the site are checked for a name match; every
    /// failure mode here degrades to the configured id.
    async fn resolve_drive_id(&self, access_token: &str) -> String {
        let Some(label) = self.settings.drive_name.as_deref() else {
            return self.settings.drive_id.clone();
        };

        match self.list_drives(access_token).await {
            Ok(drives) => match drives.into_iter().find(|d| d.name.as_deref() == Some(label)) {
                Some(drive) => {
                    info!("Resolved drive '{}' to id {}", label, drive.id);
                    drive.id
                }
                None => {
                    warn!(
                        "No drive named '{}' on site {}, using configured drive id",
                        label, self.settings.site_id
                    );
                    self.settings.drive_id.clone()
                }
            },
            Err(e) => {
                warn!("Drive discovery failed ({}), using configured drive id", e);
                self.settings.drive_id.clone()
            }
        }
    }

    async fn list_drives(&self, access_token: &str) -> Result<Vec<DriveEntry>, StorageError> {
        let url = format!(
            "{}/v1.0/sites/{}/drives",
            self.graph_base, self.settings.site_id
        );

        let response = self.client.get(&url).bearer_auth(access_token).send().await?;

        if !response.status().is_success() {
            return Err(StorageError::Network(format!(
                "Drive listing returned status {}",
                response.status()
            )));
        }

        let drives: DriveList = response
            .json()
            .await
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        Ok(drives.value)
    }
}

#[async_trait]
impl DocumentStore for GraphStorageService {
    async fn upload(&self, file_data: FileData) -> Result<UploadReceipt, ApplicationError> {
        let FileData {
            content,
            filename,
            mime_type,
        } = file_data;

        info!("Requesting access token for upload of '{}'", filename);
        let access_token = self.fetch_access_token().await?;

        let drive_id = self.resolve_drive_id(&access_token).await;

        let url = format!(
            "{}/v1.0/sites/{}/drives/{}/root:/{}:/content",
            self.graph_base, self.settings.site_id, drive_id, filename
        );

        info!(
            "Uploading {} bytes to drive {} as '{}'",
            content.len(),
            drive_id,
            filename
        );

        let response = self
            .client
            .put(&url)
            .bearer_auth(&access_token)
            .header(header::CONTENT_TYPE, mime_type)
            .body(content)
            .send()
            .await
            .map_err(StorageError::from)?;

        let status = response.status();
        let text = response.text().await.map_err(StorageError::from)?;
        let detail: Value = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "raw": text }));

        if !status.is_success() {
            let message = match status.as_u16() {
                401 => "Upload rejected: invalid or expired credentials",
                403 => "Upload rejected: missing permissions on the target drive",
                404 => "Upload target not found",
                409 => "Upload conflict: the item is locked or already being modified",
                _ => "Upload failed",
            };

            return Err(StorageError::Upload {
                status: status.as_u16(),
                message: message.to_string(),
                detail,
            }
            .into());
        }

        info!("Upload of '{}' completed", filename);

        Ok(UploadReceipt {
            file_name: filename,
            remote: detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(drive_name: Option<&str>) -> GraphSettings {
        GraphSettings {
            client_id: "app-id".to_string(),
            client_secret: "app-secret".to_string(),
            tenant_id: "tenant-id".to_string(),
            site_id: "site-id".to_string(),
            drive_id: "drive-id".to_string(),
            drive_name: drive_name.map(|s| s.to_string()),
            timeout_secs: 5,
        }
    }

    fn service(mock_server: &MockServer, drive_name: Option<&str>) -> GraphStorageService {
        GraphStorageService::with_endpoints(
            settings(drive_name),
            mock_server.uri(),
            mock_server.uri(),
        )
        .unwrap()
    }

    fn pdf_file() -> FileData {
        FileData::new(
            b"%PDF-1.4 fake".to_vec(),
            "form.pdf".to_string(),
            "application/pdf".to_string(),
        )
    }

    async fn mount_token_ok(mock_server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/tenant-id/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "access_token": "T",
                    "expires_in": 3599
                })),
            )
            .mount(mock_server)
            .await;
    }

    #[tokio::test]
    async fn upload_succeeds_with_token_and_put() {
        let mock_server = MockServer::start().await;
        mount_token_ok(&mock_server).await;

        Mock::given(method("PUT"))
            .and(path("/v1.0/sites/site-id/drives/drive-id/root:/form.pdf:/content"))
            .and(header("authorization", "Bearer T"))
            .and(header("content-type", "application/pdf"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "abc",
                "name": "form.pdf"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let receipt = service(&mock_server, None).upload(pdf_file()).await.unwrap();

        assert_eq!(receipt.file_name, "form.pdf");
        assert_eq!(receipt.remote["id"], "abc");
    }

    #[tokio::test]
    async fn non_json_token_response_fails_before_upload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-id/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&mock_server)
            .await;

        // The content endpoint must never be reached.
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let err = service(&mock_server, None).upload(pdf_file()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::TokenParse(_)));
    }

    #[tokio::test]
    async fn token_rejection_carries_upstream_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-id/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_client"
            })))
            .mount(&mock_server)
            .await;

        let err = service(&mock_server, None).upload(pdf_file()).await.unwrap_err();
        match err {
            ApplicationError::AuthFailed { status, detail } => {
                assert_eq!(status, 401);
                assert!(detail.contains("invalid_client"));
            }
            other => panic!("expected AuthFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_access_token_is_an_auth_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-id/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer"
            })))
            .mount(&mock_server)
            .await;

        let err = service(&mock_server, None).upload(pdf_file()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::AuthFailed { status: 200, .. }));
    }

    #[tokio::test]
    async fn upload_404_maps_to_not_found_message() {
        let mock_server = MockServer::start().await;
        mount_token_ok(&mock_server).await;

        Mock::given(method("PUT"))
            .and(path("/v1.0/sites/site-id/drives/drive-id/root:/form.pdf:/content"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": { "code": "itemNotFound" }
            })))
            .mount(&mock_server)
            .await;

        let err = service(&mock_server, None).upload(pdf_file()).await.unwrap_err();
        match err {
            ApplicationError::UploadFailed { status, message, detail } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Upload target not found");
                assert_eq!(detail["error"]["code"], "itemNotFound");
            }
            other => panic!("expected UploadFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn non_json_upload_body_is_wrapped_raw() {
        let mock_server = MockServer::start().await;
        mount_token_ok(&mock_server).await;

        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&mock_server)
            .await;

        let err = service(&mock_server, None).upload(pdf_file()).await.unwrap_err();
        match err {
            ApplicationError::UploadFailed { status, detail, .. } => {
                assert_eq!(status, 502);
                assert_eq!(detail["raw"], "bad gateway");
            }
            other => panic!("expected UploadFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn drive_discovery_picks_matching_name() {
        let mock_server = MockServer::start().await;
        mount_token_ok(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/v1.0/sites/site-id/drives"))
            .and(header("authorization", "Bearer T"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [
                    { "id": "other-drive", "name": "Archive" },
                    { "id": "resolved-drive", "name": "Documents" }
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/v1.0/sites/site-id/drives/resolved-drive/root:/form.pdf:/content"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "abc" })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let receipt = service(&mock_server, Some("Documents"))
            .upload(pdf_file())
            .await
            .unwrap();
        assert_eq!(receipt.remote["id"], "abc");
    }

    #[tokio::test]
    async fn drive_discovery_failure_falls_back_to_configured_id() {
        let mock_server = MockServer::start().await;
        mount_token_ok(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/v1.0/sites/site-id/drives"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&mock_server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/v1.0/sites/site-id/drives/drive-id/root:/form.pdf:/content"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "abc" })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let receipt = service(&mock_server, Some("Documents"))
            .upload(pdf_file())
            .await
            .unwrap();
        assert_eq!(receipt.remote["id"], "abc");
    }

    #[tokio::test]
    async fn unmatched_drive_name_falls_back_to_configured_id() {
        let mock_server = MockServer::start().await;
        mount_token_ok(&mock_server).await;

        Mock::given(method("GET"))
            .and(path("/v1.0/sites/site-id/drives"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{ "id": "other-drive", "name": "Archive" }]
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/v1.0/sites/site-id/drives/drive-id/root:/form.pdf:/content"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "abc" })))
            .expect(1)
            .mount(&mock_server)
            .await;

        service(&mock_server, Some("Documents"))
            .upload(pdf_file())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn slow_token_endpoint_surfaces_as_timeout() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-id/oauth2/v2.0/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "T" }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let mut cfg = settings(None);
        cfg.timeout_secs = 1;
        let service =
            GraphStorageService::with_endpoints(cfg, mock_server.uri(), mock_server.uri()).unwrap();

        let err = service.upload(pdf_file()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::Timeout(_)));
    }
}
