use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for a file mirrored to Drive
#[derive(Debug, Clone, FromRow)]
pub struct DriveFile {
    pub id: Uuid,
    /// Generated display name, e.g. `DF-000042`
    pub name: String,
    pub file_name: String,
    pub drive_file_id: String,
    pub drive_link: String,
    pub related_record_id: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Data for recording a completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDriveFile {
    pub file_name: String,
    pub drive_file_id: String,
    pub drive_link: String,
    pub related_record_id: String,
}
