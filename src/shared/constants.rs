/// Content type used when the file extension is missing or unknown
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Drive marks folders with this MIME type
pub const DRIVE_FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Largest bulk notification the CRM sends in one call
pub const MAX_FILE_VERSIONS_PER_NOTIFICATION: u64 = 200;
