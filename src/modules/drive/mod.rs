//! Google Drive access
//!
//! `DriveApi` is the seam the upload handler talks to; `DriveClient` is the
//! `google_drive3` hub implementation and `FolderResolver` layers
//! resolve-or-create on top.

mod drive_client;
mod folders;

pub use drive_client::DriveClient;
pub use folders::FolderResolver;

use async_trait::async_trait;

use crate::core::error::Result;

/// File bytes plus the metadata Drive needs to place them
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub parent_id: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Remote file created by an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub id: String,
    pub web_view_link: String,
}

#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Look up a non-trashed folder by exact name directly under `parent_id`
    async fn find_folder(&self, name: &str, parent_id: &str) -> Result<Option<String>>;

    /// Create a folder under `parent_id` and return its id
    async fn create_folder(&self, name: &str, parent_id: &str) -> Result<String>;

    /// Upload file content in a single multipart request
    async fn upload_file(&self, upload: FileUpload) -> Result<UploadedFile>;
}
