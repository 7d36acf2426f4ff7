use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Response},
    Json,
};

use crate::core::error::Result;
use crate::core::extractor::RecordIdPath;
use crate::features::drive_files::components::{DriveFileTable, TableState};
use crate::features::drive_files::dtos::DriveFileResponseDto;
use crate::features::drive_files::services::DriveFileService;
use crate::shared::types::{ApiResponse, Meta};

/// Shared state of the drive files routes
#[derive(Clone)]
pub struct DriveFilesState {
    pub service: Arc<DriveFileService>,
    /// `Cache-Control` value sent with successful query results only
    pub cache_control: HeaderValue,
}

impl DriveFilesState {
    pub fn new(service: Arc<DriveFileService>, cache_max_age_secs: u32) -> Self {
        let cache_control =
            HeaderValue::from_str(&format!("private, max-age={}", cache_max_age_secs))
                .unwrap_or_else(|_| HeaderValue::from_static("no-store"));
        Self {
            service,
            cache_control,
        }
    }
}

/// List Drive files recorded for a CRM record
///
/// Newest upload first. Returns an empty list for a record with no files.
#[utoipa::path(
    get,
    path = "/api/records/{record_id}/drive-files",
    params(
        ("record_id" = String, Path, description = "CRM record id")
    ),
    responses(
        (status = 200, description = "Drive files for the record", body = ApiResponse<Vec<DriveFileResponseDto>>),
        (status = 400, description = "Invalid record id"),
        (status = 401, description = "Missing or invalid API key")
    ),
    security(
        ("api_key" = [])
    ),
    tag = "drive_files"
)]
pub async fn list_drive_files(
    State(state): State<DriveFilesState>,
    RecordIdPath(record_id): RecordIdPath,
) -> Result<Response> {
    let files = state.service.list_for_record(&record_id).await?;
    let meta = Meta {
        total: files.len() as i64,
    };
    Ok((
        [(header::CACHE_CONTROL, state.cache_control)],
        Json(ApiResponse::success(Some(files), None, Some(meta))),
    )
        .into_response())
}

/// Render the Drive files table for a CRM record
///
/// Query failures are shown inside the table markup rather than as an error
/// status, and such pages are never marked cacheable.
#[utoipa::path(
    get,
    path = "/records/{record_id}/drive-files",
    params(
        ("record_id" = String, Path, description = "CRM record id")
    ),
    responses(
        (status = 200, description = "HTML table of Drive files", content_type = "text/html", body = String),
        (status = 400, description = "Invalid record id"),
        (status = 401, description = "Missing or invalid API key")
    ),
    security(
        ("api_key" = [])
    ),
    tag = "drive_files"
)]
pub async fn render_drive_file_table(
    State(state): State<DriveFilesState>,
    RecordIdPath(record_id): RecordIdPath,
) -> Result<Response> {
    let mut table = DriveFileTable::new(state.service);
    table.set_record_id(&record_id).await;
    let html = Html(table.render()?);

    match table.state() {
        TableState::Loaded(_) => {
            Ok(([(header::CACHE_CONTROL, state.cache_control)], html).into_response())
        }
        _ => Ok(html.into_response()),
    }
}
