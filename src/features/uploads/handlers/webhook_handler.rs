use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::uploads::dtos::{DispatchSummaryDto, FileVersionNotificationDto};
use crate::features::uploads::services::UploadTriggerService;
use crate::shared::types::ApiResponse;

/// Receive new file versions from the CRM
///
/// Each file version is uploaded to Drive once for every record it is linked
/// to, user records excepted. Uploads run after the response is sent.
#[utoipa::path(
    post,
    path = "/api/webhooks/file-versions",
    request_body = FileVersionNotificationDto,
    responses(
        (status = 202, description = "Uploads dispatched", body = ApiResponse<DispatchSummaryDto>),
        (status = 400, description = "Malformed or empty notification"),
        (status = 401, description = "Missing or invalid webhook secret")
    ),
    security(
        ("webhook_secret" = [])
    ),
    tag = "uploads"
)]
pub async fn receive_file_versions(
    State(service): State<Arc<UploadTriggerService>>,
    AppJson(dto): AppJson<FileVersionNotificationDto>,
) -> Result<(StatusCode, Json<ApiResponse<DispatchSummaryDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let summary = service.handle(&dto.file_versions).await;
    tracing::info!(
        "File version notification: {} dispatched, {} skipped",
        summary.dispatched,
        summary.skipped
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(Some(summary), None, None)),
    ))
}
