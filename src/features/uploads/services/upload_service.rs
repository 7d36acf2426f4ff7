use std::sync::Arc;

use tracing::{debug, info};

use crate::core::error::Result;
use crate::features::drive_files::models::{CreateDriveFile, DriveFile};
use crate::features::drive_files::services::DriveFileService;
use crate::modules::crm::CrmApi;
use crate::modules::drive::{DriveApi, FileUpload, FolderResolver};
use crate::shared::constants::DEFAULT_CONTENT_TYPE;

/// Content type for a file extension, case-insensitive
///
/// Unknown or missing extensions map to `application/octet-stream`.
pub fn content_type_for_extension(extension: Option<&str>) -> &'static str {
    let Some(extension) = extension else {
        return DEFAULT_CONTENT_TYPE;
    };

    match extension.trim_start_matches('.').to_lowercase().as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "xml" => "application/xml",
        "zip" => "application/zip",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// Moves one CRM file version into Drive under `<ObjectType>/<RecordId>/`
pub struct UploadService {
    crm: Arc<dyn CrmApi>,
    drive: Arc<dyn DriveApi>,
    folders: FolderResolver,
    drive_files: Arc<DriveFileService>,
    root_folder_id: String,
}

impl UploadService {
    pub fn new(
        crm: Arc<dyn CrmApi>,
        drive: Arc<dyn DriveApi>,
        drive_files: Arc<DriveFileService>,
        root_folder_id: impl Into<String>,
    ) -> Self {
        Self {
            folders: FolderResolver::new(Arc::clone(&drive)),
            crm,
            drive,
            drive_files,
            root_folder_id: root_folder_id.into(),
        }
    }

    /// Upload a file version for its owning record and record the result
    ///
    /// Steps run strictly in order; the first failure aborts the upload and no
    /// metadata row is written.
    pub async fn upload(&self, file_version_id: &str, record_id: &str) -> Result<DriveFile> {
        let version = self.crm.get_file_version(file_version_id).await?;
        let content = self.crm.get_file_content(file_version_id).await?;

        let file_name = version.file_name();
        let content_type = content_type_for_extension(version.extension().as_deref());
        debug!(
            "File version {} is '{}' ({}, {} bytes)",
            file_version_id,
            file_name,
            content_type,
            content.len()
        );

        let object_type = self.crm.object_type_of(record_id).await?;
        let type_folder_id = self
            .folders
            .resolve_or_create(&object_type, &self.root_folder_id)
            .await?;
        let record_folder_id = self
            .folders
            .resolve_or_create(record_id, &type_folder_id)
            .await?;

        let uploaded = self
            .drive
            .upload_file(FileUpload {
                name: file_name.clone(),
                parent_id: record_folder_id,
                content_type: content_type.to_string(),
                data: content,
            })
            .await?;

        info!(
            "Uploaded '{}' to Drive folder {}/{} as {}",
            file_name, object_type, record_id, uploaded.id
        );

        self.drive_files
            .record_upload(CreateDriveFile {
                file_name,
                drive_file_id: uploaded.id,
                drive_link: uploaded.web_view_link,
                related_record_id: record_id.to_string(),
            })
            .await
    }
}
