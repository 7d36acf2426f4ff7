use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use crate::core::middleware::{shared_secret_middleware, SharedSecret};
use crate::features::drive_files::handlers::{self, DriveFilesState};
use crate::features::drive_files::services::DriveFileService;

/// Create routes for the drive files feature
///
/// Every route requires the API key. Successful query results may be cached
/// privately for `cache_max_age_secs`.
pub fn routes(
    service: Arc<DriveFileService>,
    api_key: SharedSecret,
    cache_max_age_secs: u32,
) -> Router {
    Router::new()
        .route(
            "/api/records/{record_id}/drive-files",
            get(handlers::list_drive_files),
        )
        .route(
            "/records/{record_id}/drive-files",
            get(handlers::render_drive_file_table),
        )
        .route_layer(middleware::from_fn_with_state(
            api_key,
            shared_secret_middleware,
        ))
        .with_state(DriveFilesState::new(service, cache_max_age_secs))
}
