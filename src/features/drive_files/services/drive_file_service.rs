use std::sync::Arc;

use crate::core::error::Result;
use crate::features::drive_files::dtos::DriveFileResponseDto;
use crate::features::drive_files::models::{CreateDriveFile, DriveFile};
use crate::features::drive_files::repositories::DriveFileRepository;

/// Service for drive file metadata
pub struct DriveFileService {
    repository: Arc<dyn DriveFileRepository>,
}

impl DriveFileService {
    pub fn new(repository: Arc<dyn DriveFileRepository>) -> Self {
        Self { repository }
    }

    /// Record a completed upload
    pub async fn record_upload(&self, file: CreateDriveFile) -> Result<DriveFile> {
        let created = self.repository.insert(file).await?;
        tracing::info!(
            "Recorded {} ({}) for record {}",
            created.name,
            created.file_name,
            created.related_record_id
        );
        Ok(created)
    }

    /// List drive files for a record, newest first
    pub async fn list_for_record(&self, record_id: &str) -> Result<Vec<DriveFileResponseDto>> {
        let files = self.repository.find_by_record(record_id).await?;
        Ok(files.into_iter().map(Into::into).collect())
    }
}
