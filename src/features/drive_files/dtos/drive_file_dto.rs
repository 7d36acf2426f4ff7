use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::drive_files::models::DriveFile;

/// Drive file metadata as returned for a record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct DriveFileResponseDto {
    pub id: Uuid,
    /// Generated display name
    #[schema(example = "DF-000001")]
    pub name: String,
    /// Original file name
    #[schema(example = "invoice.pdf")]
    pub file_name: String,
    /// Shareable Drive link
    #[schema(example = "https://drive.google.com/file/d/1AbC/view")]
    pub drive_link: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<DriveFile> for DriveFileResponseDto {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            file_name: file.file_name,
            drive_link: file.drive_link,
            uploaded_at: file.uploaded_at,
        }
    }
}
