use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::core::middleware::{API_KEY_HEADER, WEBHOOK_SECRET_HEADER};
use crate::features::drive_files::{dtos as drive_files_dtos, handlers as drive_files_handlers};
use crate::features::uploads::{dtos as uploads_dtos, handlers as uploads_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Uploads (webhook secret)
        uploads_handlers::receive_file_versions,
        // Drive files (API key)
        drive_files_handlers::list_drive_files,
        drive_files_handlers::render_drive_file_table,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Uploads
            uploads_dtos::FileVersionNotificationDto,
            uploads_dtos::FileVersionRefDto,
            uploads_dtos::DispatchSummaryDto,
            ApiResponse<uploads_dtos::DispatchSummaryDto>,
            // Drive files
            drive_files_dtos::DriveFileResponseDto,
            ApiResponse<Vec<drive_files_dtos::DriveFileResponseDto>>,
        )
    ),
    tags(
        (name = "uploads", description = "CRM notifications that trigger Drive uploads"),
        (name = "drive_files", description = "Drive files recorded per CRM record"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Drive Sync API",
        version = "0.1.0",
        description = "Mirrors CRM file uploads into Google Drive",
    )
)]
pub struct ApiDoc;

/// Adds the shared-secret header schemes to the OpenAPI document
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "webhook_secret",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(WEBHOOK_SECRET_HEADER))),
            );
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
