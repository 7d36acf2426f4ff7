//! Google Drive v3 client on the generated `google_drive3` hub
//!
//! Folder lookup and creation go through the metadata API; uploads use the
//! hub's multipart media upload. Tokens come from a `yup_oauth2`
//! authenticator, either a service account or a user's refresh token.

use std::future::Future;
use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
// google-apis-rs generated client.
use google_drive3 as drive3;

use drive3::api::{File, Scope};
use drive3::hyper_util::client::legacy::{connect::HttpConnector, Client};
use drive3::hyper_util::rt::TokioExecutor;
use drive3::DriveHub;
use tracing::{debug, info};

use super::{DriveApi, FileUpload, UploadedFile};
use crate::core::config::{DriveAuth, DriveConfig};
use crate::core::error::{AppError, Result};
use crate::shared::constants::DRIVE_FOLDER_MIME_TYPE;

type HttpsConnector = drive3::hyper_rustls::HttpsConnector<HttpConnector>;

pub struct DriveClient {
    hub: DriveHub<HttpsConnector>,
    timeout: Duration,
}

impl DriveClient {
    /// Build the hub and its authenticator from configuration
    pub async fn connect(config: &DriveConfig) -> Result<Self> {
        let connector = drive3::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| AppError::Internal(format!("Failed to load native root certs: {}", e)))?
            .https_only()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let hub = match &config.auth {
            DriveAuth::ServiceAccount { key_path } => {
                let key = drive3::yup_oauth2::read_service_account_key(key_path)
                    .await
                    .map_err(|e| {
                        AppError::Internal(format!(
                            "Failed to read Drive service account key {}: {}",
                            key_path.display(),
                            e
                        ))
                    })?;
                let auth = drive3::yup_oauth2::ServiceAccountAuthenticator::builder(key)
                    .build()
                    .await
                    .map_err(|e| {
                        AppError::Internal(format!("Failed to build Drive authenticator: {}", e))
                    })?;
                info!("Drive authenticator: service account");
                DriveHub::new(client, auth)
            }
            DriveAuth::AuthorizedUser {
                client_id,
                client_secret,
                refresh_token,
            } => {
                let secret = drive3::yup_oauth2::authorized_user::AuthorizedUserSecret {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    refresh_token: refresh_token.clone(),
                    key_type: "authorized_user".to_string(),
                };
                let auth = drive3::yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
                    .build()
                    .await
                    .map_err(|e| {
                        AppError::Internal(format!("Failed to build Drive authenticator: {}", e))
                    })?;
                info!("Drive authenticator: authorized user");
                DriveHub::new(client, auth)
            }
        };

        Ok(Self::from_hub(hub, config.http_timeout))
    }

    pub fn from_hub(hub: DriveHub<HttpsConnector>, timeout: Duration) -> Self {
        Self { hub, timeout }
    }

    /// Build the `q` expression matching a folder by name and parent
    fn folder_query(name: &str, parent_id: &str) -> String {
        format!(
            "name = '{}' and '{}' in parents and mimeType = '{}' and trashed = false",
            escape_query_literal(name),
            escape_query_literal(parent_id),
            DRIVE_FOLDER_MIME_TYPE
        )
    }

    /// Run a hub call under the configured timeout
    async fn call<T>(
        &self,
        operation: &str,
        request: impl Future<Output = drive3::Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(AppError::ExternalServiceError(format!(
                "Drive {} failed: {}",
                operation, e
            ))),
            Err(_) => Err(AppError::ExternalServiceError(format!(
                "Drive {} timed out after {:?}",
                operation, self.timeout
            ))),
        }
    }
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<String>> {
        let query = Self::folder_query(name, parent_id);

        let (_, list) = self
            .call(
                "folder lookup",
                self.hub
                    .files()
                    .list()
                    .q(&query)
                    .spaces("drive")
                    .supports_all_drives(true)
                    .include_items_from_all_drives(true)
                    .page_size(1)
                    .param("fields", "files(id,name)")
                    .add_scope(Scope::Full)
                    .doit(),
            )
            .await?;

        let found = list
            .files
            .unwrap_or_default()
            .into_iter()
            .find_map(|f| f.id);
        debug!(
            "Folder lookup '{}' under '{}': {:?}",
            name, parent_id, found
        );
        Ok(found)
    }

    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String> {
        let folder = File {
            name: Some(name.to_string()),
            parents: Some(vec![parent_id.to_string()]),
            mime_type: Some(DRIVE_FOLDER_MIME_TYPE.to_string()),
            ..Default::default()
        };

        let (_, created) = self
            .call(
                "folder create",
                self.hub
                    .files()
                    .create(folder)
                    .supports_all_drives(true)
                    .param("fields", "id")
                    .add_scope(Scope::Full)
                    .doit_without_upload(),
            )
            .await?;

        let id = created.id.ok_or_else(|| {
            AppError::ExternalServiceError("Drive folder create returned no id".to_string())
        })?;
        info!("Created Drive folder '{}' under '{}': {}", name, parent_id, id);
        Ok(id)
    }

    async fn upload_file(&self, upload: FileUpload) -> Result<UploadedFile> {
        let mime: mime::Mime = upload
            .content_type
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);
        let metadata = File {
            name: Some(upload.name.clone()),
            parents: Some(vec![upload.parent_id.clone()]),
            ..Default::default()
        };
        let size = upload.data.len();

        let (_, created) = self
            .call(
                "upload",
                self.hub
                    .files()
                    .create(metadata)
                    // Make this work for shared drives too.
                    .supports_all_drives(true)
                    .param("fields", "id,name,webViewLink")
                    .add_scope(Scope::Full)
                    .upload(Cursor::new(upload.data), mime),
            )
            .await?;

        let id = created.id.ok_or_else(|| {
            AppError::ExternalServiceError("Drive upload returned no file id".to_string())
        })?;
        // webViewLink is only returned when the caller can see it
        let web_view_link = created
            .web_view_link
            .filter(|link| !link.is_empty())
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", id));

        info!(
            "Uploaded '{}' ({} bytes, {}) to Drive folder '{}': {}",
            upload.name, size, upload.content_type, upload.parent_id, id
        );

        Ok(UploadedFile { id, web_view_link })
    }
}

/// Escape a string literal for a Drive `q` expression
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
