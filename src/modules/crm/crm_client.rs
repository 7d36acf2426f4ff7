//! CRM REST client (Salesforce-style `services/data` API)

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{CrmApi, FileVersion};
use crate::core::config::CrmConfig;
use crate::core::error::{AppError, Result};
use crate::modules::oauth::OAuthTokenManager;
use crate::shared::validation::RECORD_ID_REGEX;

const FILE_VERSION_FIELDS: &str = "Id,Title,FileExtension,PathOnClient,ContentDocumentId";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse<T> {
    records: Vec<T>,
    #[serde(default)]
    next_records_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DocumentLink {
    linked_entity_id: String,
}

#[derive(Debug, Deserialize)]
struct DescribeGlobal {
    sobjects: Vec<SObjectSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SObjectSummary {
    name: String,
    #[serde(default)]
    key_prefix: Option<String>,
}

pub struct CrmClient {
    http_client: Client,
    tokens: Arc<OAuthTokenManager>,
    instance_url: String,
    data_url: String,
    /// Key prefix -> object API name, loaded once from describe-global
    key_prefixes: OnceCell<HashMap<String, String>>,
}

impl CrmClient {
    pub fn new(config: &CrmConfig, http_client: Client, tokens: Arc<OAuthTokenManager>) -> Self {
        Self {
            http_client,
            tokens,
            instance_url: config.instance_url.clone(),
            data_url: format!(
                "{}/services/data/{}",
                config.instance_url, config.api_version
            ),
            key_prefixes: OnceCell::new(),
        }
    }

    /// Reject identifiers that could alter a SOQL statement or URL path
    fn checked_id<'a>(kind: &str, id: &'a str) -> Result<&'a str> {
        if RECORD_ID_REGEX.is_match(id) {
            Ok(id)
        } else {
            Err(AppError::Validation(format!("Invalid {} id: '{}'", kind, id)))
        }
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        let token = self.tokens.get_access_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("CRM request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("CRM resource not found: {}", body)));
        }
        Err(AppError::ExternalServiceError(format!(
            "CRM request failed: {} - {}",
            status, body
        )))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        self.get(url, query)
            .await?
            .json()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("Invalid CRM response: {}", e)))
    }

    async fn load_key_prefixes(&self) -> Result<HashMap<String, String>> {
        let describe: DescribeGlobal = self
            .get_json(&format!("{}/sobjects", self.data_url), &[])
            .await?;

        let prefixes: HashMap<String, String> = describe
            .sobjects
            .into_iter()
            .filter_map(|o| o.key_prefix.map(|prefix| (prefix, o.name)))
            .collect();

        info!("Loaded {} CRM object key prefixes", prefixes.len());
        Ok(prefixes)
    }
}

#[async_trait]
impl CrmApi for CrmClient {
    async fn linked_entity_ids(&self, content_document_id: &str) -> Result<Vec<String>> {
        let document_id = Self::checked_id("content document", content_document_id)?;
        let soql = format!(
            "SELECT LinkedEntityId FROM ContentDocumentLink WHERE ContentDocumentId = '{}'",
            document_id
        );

        let mut page: QueryResponse<DocumentLink> = self
            .get_json(&format!("{}/query", self.data_url), &[("q", soql.as_str())])
            .await?;
        let mut ids: Vec<String> = page.records.drain(..).map(|l| l.linked_entity_id).collect();

        // Follow pagination cursors; they are instance-relative paths
        while let Some(next) = page.next_records_url.take() {
            page = self
                .get_json(&format!("{}{}", self.instance_url, next), &[])
                .await?;
            ids.extend(page.records.drain(..).map(|l| l.linked_entity_id));
        }

        debug!(
            "Content document {} is linked to {} entities",
            content_document_id,
            ids.len()
        );
        Ok(ids)
    }

    async fn get_file_version(&self, file_version_id: &str) -> Result<FileVersion> {
        let id = Self::checked_id("file version", file_version_id)?;
        self.get_json(
            &format!(
                "{}/sobjects/ContentVersion/{}",
                self.data_url,
                urlencoding::encode(id)
            ),
            &[("fields", FILE_VERSION_FIELDS)],
        )
        .await
    }

    async fn get_file_content(&self, file_version_id: &str) -> Result<Vec<u8>> {
        let id = Self::checked_id("file version", file_version_id)?;
        let bytes = self
            .get(
                &format!(
                    "{}/sobjects/ContentVersion/{}/VersionData",
                    self.data_url,
                    urlencoding::encode(id)
                ),
                &[],
            )
            .await?
            .bytes()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Failed to read file content: {}", e))
            })?;

        debug!("Fetched {} bytes for file version {}", bytes.len(), id);
        Ok(bytes.to_vec())
    }

    async fn object_type_of(&self, record_id: &str) -> Result<String> {
        let id = Self::checked_id("record", record_id)?;
        let prefix = id.get(..3).ok_or_else(|| {
            AppError::Validation(format!("Record id '{}' has no key prefix", record_id))
        })?;

        let prefixes = self
            .key_prefixes
            .get_or_try_init(|| self.load_key_prefixes())
            .await?;

        prefixes.get(prefix).cloned().ok_or_else(|| {
            AppError::NotFound(format!("No CRM object uses key prefix '{}'", prefix))
        })
    }
}
