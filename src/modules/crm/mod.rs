//! CRM access
//!
//! The service only reads from the CRM: which records a file is linked to,
//! the file-version metadata and bytes, and which object a record id names.

mod crm_client;

pub use crm_client::CrmClient;

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::error::Result;

/// A file version as stored in the CRM
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileVersion {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub file_extension: Option<String>,
    #[serde(default)]
    pub path_on_client: Option<String>,
    pub content_document_id: String,
}

impl FileVersion {
    /// File name as uploaded: title plus extension, else the client path's last segment
    pub fn file_name(&self) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            return self
                .path_on_client
                .as_deref()
                .and_then(|p| p.rsplit(['/', '\\']).next())
                .filter(|name| !name.is_empty())
                .unwrap_or("untitled")
                .to_string();
        }

        match self.file_extension.as_deref().filter(|ext| !ext.is_empty()) {
            Some(ext) if !title.to_lowercase().ends_with(&format!(".{}", ext.to_lowercase())) => {
                format!("{}.{}", title, ext)
            }
            _ => title.to_string(),
        }
    }

    /// Extension used for content-type inference
    pub fn extension(&self) -> Option<String> {
        self.file_extension
            .clone()
            .filter(|ext| !ext.is_empty())
            .or_else(|| {
                let name = self.file_name();
                name.rsplit_once('.')
                    .map(|(_, ext)| ext.to_string())
                    .filter(|ext| !ext.is_empty())
            })
    }
}

#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Ids of every entity the content document is linked to, users included
    async fn linked_entity_ids(&self, content_document_id: &str) -> Result<Vec<String>>;

    async fn get_file_version(&self, file_version_id: &str) -> Result<FileVersion>;

    async fn get_file_content(&self, file_version_id: &str) -> Result<Vec<u8>>;

    /// API name of the object a record id belongs to, e.g. `Account`
    async fn object_type_of(&self, record_id: &str) -> Result<String>;
}
