use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::shared::constants::MAX_FILE_VERSIONS_PER_NOTIFICATION;
use crate::shared::validation::validate_record_id;

/// Bulk notification of newly created file versions
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct FileVersionNotificationDto {
    #[validate(
        length(
            min = 1,
            max = MAX_FILE_VERSIONS_PER_NOTIFICATION,
            message = "file_versions must contain 1-200 entries"
        ),
        nested
    )]
    pub file_versions: Vec<FileVersionRefDto>,
}

/// One new file version and the content document it belongs to
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct FileVersionRefDto {
    #[validate(custom(function = validate_record_id, message = "Invalid file version id"))]
    #[schema(example = "068000000000001AAA")]
    pub id: String,
    #[validate(custom(function = validate_record_id, message = "Invalid content document id"))]
    #[schema(example = "069000000000001AAA")]
    pub content_document_id: String,
}

/// Outcome of a notification: uploads handed off and files left alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DispatchSummaryDto {
    /// Upload jobs dispatched, one per (file version, owning record) pair
    pub dispatched: usize,
    /// File versions with no owning record or whose links could not be read
    pub skipped: usize,
}
