use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, middleware, routing::post, Router};

use crate::core::middleware::{shared_secret_middleware, SharedSecret};
use crate::features::uploads::handlers;
use crate::features::uploads::services::UploadTriggerService;

/// Create routes for the uploads feature
///
/// The webhook is authenticated with the shared webhook secret.
pub fn routes(
    service: Arc<UploadTriggerService>,
    webhook_secret: SharedSecret,
    max_body_size: usize,
) -> Router {
    Router::new()
        .route(
            "/api/webhooks/file-versions",
            post(handlers::receive_file_versions).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route_layer(middleware::from_fn_with_state(
            webhook_secret,
            shared_secret_middleware,
        ))
        .with_state(service)
}
