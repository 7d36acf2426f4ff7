use async_trait::async_trait;
use sqlx::PgPool;

use crate::core::error::{AppError, Result};
use crate::features::drive_files::models::{CreateDriveFile, DriveFile};

/// Persistence for drive file metadata rows
///
/// Rows are append-only: created once after a successful upload, never
/// updated or deleted here.
#[async_trait]
pub trait DriveFileRepository: Send + Sync {
    async fn insert(&self, file: CreateDriveFile) -> Result<DriveFile>;

    /// All rows for a record, newest upload first
    async fn find_by_record(&self, related_record_id: &str) -> Result<Vec<DriveFile>>;
}

pub struct PgDriveFileRepository {
    pool: PgPool,
}

impl PgDriveFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DriveFileRepository for PgDriveFileRepository {
    async fn insert(&self, file: CreateDriveFile) -> Result<DriveFile> {
        sqlx::query_as::<_, DriveFile>(
            r#"
            INSERT INTO drive_files (file_name, drive_file_id, drive_link, related_record_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, file_name, drive_file_id, drive_link, related_record_id, uploaded_at
            "#,
        )
        .bind(&file.file_name)
        .bind(&file.drive_file_id)
        .bind(&file.drive_link)
        .bind(&file.related_record_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert drive file: {:?}", e);
            AppError::Database(e)
        })
    }

    async fn find_by_record(&self, related_record_id: &str) -> Result<Vec<DriveFile>> {
        sqlx::query_as::<_, DriveFile>(
            r#"
            SELECT id, name, file_name, drive_file_id, drive_link, related_record_id, uploaded_at
            FROM drive_files
            WHERE related_record_id = $1
            ORDER BY uploaded_at DESC
            "#,
        )
        .bind(related_record_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list drive files: {:?}", e);
            AppError::Database(e)
        })
    }
}
